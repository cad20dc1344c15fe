use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::error::DbErr;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// JSON error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Insufficient stock: product 550e8400-e29b-41d4-a716-446655440000 has 2, requested 3",
    "request_id": "4f1c2a7e-7f8e-4a52-9a57-0c8d1b3e2f10",
    "timestamp": "2024-01-01T10:30:00+00:00"
}))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub error: String,
    /// Additional error details, e.g. field level validation output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request identifier echoed from the `x-request-id` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
    /// Set on lockout responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    /// Minutes remaining before a locked account can log in again
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_minutes: Option<i64>,
    /// Login attempts left before the account locks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<i32>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            request_id: current_request_id(),
            timestamp: Utc::now().to_rfc3339(),
            locked_until: None,
            wait_minutes: None,
            remaining_attempts: None,
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Insufficient points: {0}")]
    InsufficientPoints(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid username or password")]
    InvalidCredentials { remaining_attempts: Option<i32> },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Account locked, try again in {wait_minutes} minutes")]
    AccountLocked {
        locked_until: DateTime<Utc>,
        wait_minutes: i64,
    },

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        ServiceError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_)
            | Self::InternalError(_)
            | Self::JwtError(_)
            | Self::HashError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidTransition { .. }
            | Self::InsufficientStock(_)
            | Self::InsufficientPoints(_)
            | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AccountLocked { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ConcurrentModification(_) | Self::IntegrityViolation(_) => StatusCode::CONFLICT,
        }
    }

    /// Client-facing message. Server-side failures collapse to a generic one.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_)
            | Self::InternalError(_)
            | Self::JwtError(_)
            | Self::HashError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        let mut body = ErrorResponse::new(self.response_message());
        match self {
            Self::AccountLocked {
                locked_until,
                wait_minutes,
            } => {
                body.locked_until = Some(*locked_until);
                body.wait_minutes = Some(*wait_minutes);
            }
            Self::InvalidCredentials { remaining_attempts } => {
                body.remaining_attempts = *remaining_attempts;
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.to_error_response())).into_response()
    }
}

/// Handler-level failures that never reach a service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        error_code: Option<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            ApiError::ServiceError(service_error) => return service_error.into_response(),
            ApiError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "Validation failed".to_string(), Some(msg))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            ApiError::BadRequest {
                message,
                error_code,
            } => (StatusCode::BAD_REQUEST, message, error_code),
        };

        let mut body = ErrorResponse::new(error_message);
        body.details = details;
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections render through [`ApiError`], so malformed
/// bodies get the same envelope as every other 400.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest {
        message: format!("Invalid request body: {}", rejection.body_text()),
        error_code: Some("invalid_json".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    async fn body_of(response: Response) -> ErrorResponse {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let payload = body_of(response).await;
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "Not found: missing");
    }

    #[tokio::test]
    async fn lockout_response_carries_wait_hint() {
        let locked_until = Utc::now() + chrono::Duration::minutes(15);
        let response = ServiceError::AccountLocked {
            locked_until,
            wait_minutes: 15,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let payload = body_of(response).await;
        assert_eq!(payload.wait_minutes, Some(15));
        assert!(payload.locked_until.is_some());
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let response =
            ServiceError::DatabaseError(DbErr::Custom("syntax error near SELECT".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.error, "Internal server error");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::invalid_transition("draft", "completed").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidCredentials {
                remaining_attempts: Some(2)
            }
            .status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::ConcurrentModification("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::IntegrityViolation("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::HashError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn transition_message_names_both_states() {
        assert_eq!(
            ServiceError::invalid_transition("draft", "completed").response_message(),
            "Invalid status transition from draft to completed"
        );
    }

    #[tokio::test]
    async fn api_validation_error_puts_field_errors_in_details() {
        let response = ApiError::ValidationError("name: length".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = body_of(response).await;
        assert_eq!(payload.error, "Validation failed");
        assert_eq!(payload.details.as_deref(), Some("name: length"));
    }
}
