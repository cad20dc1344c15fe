/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWT authentication for the POS API:
 *
 * - HS256 access tokens signed with the configured secret; a previous secret
 *   is still accepted for verification so keys can be rotated
 * - Opaque refresh tokens, stored only as SHA-256 digests
 * - Role allow-lists per route group, with `admin` always allowed
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{str::FromStr, sync::Arc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod password;
pub mod rate_limit;
pub mod user;

pub use password::{hash_password, verify_password};
pub use rate_limit::{LoginPolicy, LoginOutcome};
pub use user::UserRole;

/// Route allow-lists. `admin` passes every check regardless of the list.
pub mod roles {
    pub const ADMIN_ONLY: &[&str] = &["admin"];
    pub const MANAGERS: &[&str] = &["admin", "manager"];
    pub const STAFF: &[&str] = &["admin", "manager", "staff"];
    pub const CASHIERS: &[&str] = &["admin", "manager", "cashier"];
}

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub store_id: Option<Uuid>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, placed in request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub store_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins pass every allow-list.
    pub fn has_any_role(&self, allowed: &[&str]) -> bool {
        self.is_admin() || allowed.iter().any(|r| *r == self.role.to_string())
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = ServiceError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = UserRole::from_str(&claims.role)
            .map_err(|_| ServiceError::Unauthorized("token carries an unknown role".into()))?;
        Ok(Self {
            user_id: claims.user_id,
            username: claims.username,
            role,
            store_id: claims.store_id,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_previous_secret: Option<String>,
    pub issuer: String,
    pub token_ttl: ChronoDuration,
    pub remember_me_ttl: ChronoDuration,
}

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_keys: Vec<DecodingKey>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut decoding_keys = vec![DecodingKey::from_secret(config.jwt_secret.as_bytes())];
        if let Some(previous) = config.jwt_previous_secret.as_deref().filter(|s| !s.is_empty()) {
            decoding_keys.push(DecodingKey::from_secret(previous.as_bytes()));
        }
        Self {
            config,
            encoding_key,
            decoding_keys,
        }
    }

    pub fn issue_token(
        &self,
        user: &user::Model,
        remember_me: bool,
    ) -> Result<IssuedToken, ServiceError> {
        let now = Utc::now();
        let ttl = if remember_me {
            self.config.remember_me_ttl
        } else {
            self.config.token_ttl
        };
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
            store_id: user.store_id,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::JwtError(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies with the current key first, then the previous one.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let mut last_error = None;
        for key in &self.decoding_keys {
            match decode::<Claims>(token, key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(err) => last_error = Some(err),
            }
        }
        if let Some(err) = last_error {
            debug!(error = %err, "Token rejected");
        }
        Err(ServiceError::Unauthorized("invalid or expired token".into()))
    }
}

/// Random opaque token for refresh and password reset flows.
pub fn generate_opaque_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest under which opaque tokens are stored.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(parts_headers: &axum::http::HeaderMap) -> Option<&str> {
    parts_headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware: validates the bearer token and stores the caller.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ServiceError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| ServiceError::InternalError("authentication service not available".into()))?;

    let token = bearer_token(request.headers())
        .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))?;
    let user = AuthUser::try_from(auth_service.validate_token(token)?)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Role middleware: the caller's role must be in the allow-list.
pub async fn role_middleware(
    State(allowed): State<&'static [&'static str]>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))?;

    if !user.has_any_role(allowed) {
        debug!(user_id = %user.user_id, role = %user.role, "Role not permitted");
        return Err(ServiceError::Forbidden("insufficient permissions".into()));
    }
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, allowed: &'static [&'static str]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.route_layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_roles(self, allowed: &'static [&'static str]) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(
            allowed,
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config(secret: &str, previous: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_previous_secret: previous.map(str::to_string),
            issuer: "retail-pos".to_string(),
            token_ttl: ChronoDuration::hours(24),
            remember_me_ttl: ChronoDuration::days(7),
        }
    }

    fn user(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "cashier01".into(),
            password_hash: String::new(),
            name: "Cashier".into(),
            email: None,
            phone: None,
            role,
            store_id: Some(Uuid::new_v4()),
            status: true,
            login_attempts: 0,
            locked_until: None,
            last_login: None,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const OLD_SECRET: &str = "fedcba9876543210fedcba9876543210";

    #[test]
    fn issued_token_round_trips_claims() {
        let service = AuthService::new(config(SECRET, None));
        let account = user(UserRole::Cashier);
        let issued = service.issue_token(&account, false).unwrap();
        let claims = service.validate_token(&issued.token).unwrap();
        assert_eq!(claims.user_id, account.id);
        assert_eq!(claims.role, "cashier");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn remember_me_extends_lifetime() {
        let service = AuthService::new(config(SECRET, None));
        let issued = service.issue_token(&user(UserRole::Staff), true).unwrap();
        let claims = service.validate_token(&issued.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn previous_secret_still_verifies_after_rotation() {
        let old = AuthService::new(config(OLD_SECRET, None));
        let token = old.issue_token(&user(UserRole::Manager), false).unwrap().token;

        let rotated = AuthService::new(config(SECRET, Some(OLD_SECRET)));
        assert!(rotated.validate_token(&token).is_ok());

        let forgotten = AuthService::new(config(SECRET, None));
        assert_matches!(forgotten.validate_token(&token), Err(ServiceError::Unauthorized(_)));
    }

    #[test]
    fn admin_passes_every_allow_list() {
        let service = AuthService::new(config(SECRET, None));
        let token = service.issue_token(&user(UserRole::Admin), false).unwrap().token;
        let admin = AuthUser::try_from(service.validate_token(&token).unwrap()).unwrap();
        assert!(admin.has_any_role(roles::ADMIN_ONLY));
        assert!(admin.has_any_role(&[]));
    }

    #[test]
    fn cashier_is_limited_to_its_lists() {
        let cashier = AuthUser {
            user_id: Uuid::new_v4(),
            username: "c".into(),
            role: UserRole::Cashier,
            store_id: None,
        };
        assert!(cashier.has_any_role(roles::CASHIERS));
        assert!(!cashier.has_any_role(roles::MANAGERS));
        assert!(!cashier.has_any_role(roles::STAFF));
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), 48);
        assert_eq!(digest_token(&token), digest_token(&token));
        assert_eq!(digest_token(&token).len(), 64);
    }
}
