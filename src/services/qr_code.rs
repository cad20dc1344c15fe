use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{entities::product::Entity as ProductEntity, errors::ServiceError};

type HmacSha256 = Hmac<Sha256>;

const MAC_LEN: usize = 32;

/// Fields embedded in a product QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QrPayload {
    pub sku: String,
    pub batch: String,
    pub ts: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateQrCodeInput {
    #[validate(length(min = 1, max = 64, message = "Batch number is required"))]
    pub batch_number: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QrCodeResponse {
    pub product_id: Uuid,
    pub sku: String,
    pub batch_number: String,
    pub qr_code: String,
}

/// Signs and verifies product QR codes: `base64(json ‖ HMAC-SHA256(json))`.
#[derive(Clone)]
pub struct QrCodeSigner {
    key: Arc<Vec<u8>>,
}

impl QrCodeSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: Arc::new(secret.as_ref().to_vec()),
        }
    }

    fn mac(&self) -> Result<HmacSha256, ServiceError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ServiceError::InternalError(format!("invalid QR signing key: {}", e)))
    }

    pub fn sign(&self, payload: &QrPayload) -> Result<String, ServiceError> {
        let json = serde_json::to_vec(payload)
            .map_err(|e| ServiceError::InternalError(format!("QR payload encoding: {}", e)))?;
        let mut mac = self.mac()?;
        mac.update(&json);
        let tag = mac.finalize().into_bytes();

        let mut raw = json;
        raw.extend_from_slice(&tag);
        Ok(STANDARD.encode(raw))
    }

    /// Decodes `code` and checks its signature; does not look at the SKU.
    pub fn decode(&self, code: &str) -> Result<QrPayload, ServiceError> {
        let raw = STANDARD
            .decode(code.trim())
            .map_err(|_| ServiceError::ValidationError("QR code is not valid base64".into()))?;
        if raw.len() <= MAC_LEN {
            return Err(ServiceError::ValidationError("QR code is too short".into()));
        }
        let (json, tag) = raw.split_at(raw.len() - MAC_LEN);

        let mut mac = self.mac()?;
        mac.update(json);
        mac.verify_slice(tag)
            .map_err(|_| ServiceError::ValidationError("QR code signature mismatch".into()))?;

        serde_json::from_slice(json)
            .map_err(|_| ServiceError::ValidationError("QR code payload is malformed".into()))
    }

    /// Full check used at checkout: signature and SKU must both match.
    pub fn verify(&self, code: &str, expected_sku: &str) -> Result<QrPayload, ServiceError> {
        let payload = self.decode(code)?;
        if payload.sku != expected_sku {
            debug!(expected = %expected_sku, found = %payload.sku, "QR code SKU mismatch");
            return Err(ServiceError::ValidationError(format!(
                "QR code belongs to SKU {}, not {}",
                payload.sku, expected_sku
            )));
        }
        Ok(payload)
    }
}

#[derive(Clone)]
pub struct QrCodeService {
    db: Arc<DatabaseConnection>,
    signer: QrCodeSigner,
}

impl QrCodeService {
    pub fn new(db: Arc<DatabaseConnection>, signer: QrCodeSigner) -> Self {
        Self { db, signer }
    }

    #[instrument(skip(self, input))]
    pub async fn generate_for_product(
        &self,
        product_id: Uuid,
        input: GenerateQrCodeInput,
    ) -> Result<QrCodeResponse, ServiceError> {
        input.validate()?;
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let qr_code = self.signer.sign(&QrPayload {
            sku: product.sku.clone(),
            batch: input.batch_number.clone(),
            ts: Utc::now().timestamp(),
        })?;
        Ok(QrCodeResponse {
            product_id,
            sku: product.sku,
            batch_number: input.batch_number,
            qr_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn payload() -> QrPayload {
        QrPayload {
            sku: "TS-001-M-BLK".into(),
            batch: "B2024-01".into(),
            ts: 1_704_067_200,
        }
    }

    #[test]
    fn signed_code_verifies_against_its_sku() {
        let signer = QrCodeSigner::new("qr-secret");
        let code = signer.sign(&payload()).unwrap();
        assert_eq!(signer.verify(&code, "TS-001-M-BLK").unwrap(), payload());
    }

    #[test]
    fn sku_mismatch_is_rejected() {
        let signer = QrCodeSigner::new("qr-secret");
        let code = signer.sign(&payload()).unwrap();
        assert_matches!(
            signer.verify(&code, "TS-002"),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn code_signed_with_another_key_is_rejected() {
        let code = QrCodeSigner::new("other").sign(&payload()).unwrap();
        assert_matches!(
            QrCodeSigner::new("qr-secret").decode(&code),
            Err(ServiceError::ValidationError(msg)) if msg.contains("signature")
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = QrCodeSigner::new("qr-secret");
        let mut raw = STANDARD.decode(signer.sign(&payload()).unwrap()).unwrap();
        raw[10] ^= 0x01;
        assert!(signer.decode(&STANDARD.encode(raw)).is_err());
    }

    #[test]
    fn short_and_garbage_input_is_rejected() {
        let signer = QrCodeSigner::new("qr-secret");
        assert!(signer.decode(&STANDARD.encode([0u8; 32])).is_err());
        assert!(signer.decode("not base64 !!").is_err());
    }
}
