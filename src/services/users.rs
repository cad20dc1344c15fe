use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        digest_token, generate_opaque_token, hash_password,
        user::{self, Entity as UserEntity, UserProfile, UserRole},
        verify_password, AuthService, LoginOutcome, LoginPolicy,
    },
    entities::store::Entity as StoreEntity,
    errors::ServiceError,
    metrics,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserProfile,
    pub expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: UserRole,
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenInput {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

/// Email delivery is not wired up, so the token is handed back directly.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordInput {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Lifetimes for the opaque tokens kept on the user row.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub refresh: Duration,
    pub password_reset: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            refresh: Duration::days(30),
            password_reset: Duration::hours(1),
        }
    }
}

/// Accounts, login with lockout, and token lifecycle.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    policy: LoginPolicy,
    lifetimes: TokenLifetimes,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        policy: LoginPolicy,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            db,
            auth,
            policy,
            lifetimes,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        UserEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, ServiceError> {
        UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Signs an access token and rotates the stored refresh token.
    async fn start_session(
        &self,
        user: user::Model,
        remember_me: bool,
    ) -> Result<LoginResponse, ServiceError> {
        let now = Utc::now();
        let refresh_token = generate_opaque_token();
        let refresh_token_expires_at = now + self.lifetimes.refresh;

        let mut active: user::ActiveModel = user.into();
        active.login_attempts = Set(0);
        active.locked_until = Set(None);
        active.last_login = Set(Some(now));
        active.refresh_token_hash = Set(Some(digest_token(&refresh_token)));
        active.refresh_token_expires_at = Set(Some(refresh_token_expires_at));
        active.updated_at = Set(now);
        let user = active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        let issued = self.auth.issue_token(&user, remember_me)?;
        Ok(LoginResponse {
            token: issued.token,
            refresh_token,
            user: user.into(),
            expires_at: issued.expires_at,
            refresh_token_expires_at,
        })
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<LoginResponse, ServiceError> {
        input.validate()?;
        let now = Utc::now();

        let user = self
            .find_by_username(&input.username)
            .await?
            .ok_or(ServiceError::InvalidCredentials {
                remaining_attempts: None,
            })?;
        if !user.status {
            return Err(ServiceError::Forbidden("account is disabled".into()));
        }
        self.policy.check_locked(user.locked_until, now)?;

        if !verify_password(&input.password, &user.password_hash) {
            metrics::LOGIN_FAILURES.inc();
            let outcome = self
                .policy
                .record_failure(user.login_attempts, user.locked_until, now);
            let user_id = user.id;
            let mut active: user::ActiveModel = user.into();
            active.updated_at = Set(now);
            return match outcome {
                LoginOutcome::Retry {
                    attempts,
                    remaining,
                } => {
                    active.login_attempts = Set(attempts);
                    active.locked_until = Set(None);
                    active.update(&*self.db).await.map_err(ServiceError::db_error)?;
                    warn!(user_id = %user_id, attempts, "Failed login");
                    Err(ServiceError::InvalidCredentials {
                        remaining_attempts: Some(remaining),
                    })
                }
                LoginOutcome::Locked {
                    attempts,
                    locked_until,
                } => {
                    active.login_attempts = Set(attempts);
                    active.locked_until = Set(Some(locked_until));
                    active.update(&*self.db).await.map_err(ServiceError::db_error)?;
                    metrics::ACCOUNT_LOCKOUTS.inc();
                    warn!(user_id = %user_id, %locked_until, "Account locked after failed logins");
                    Err(ServiceError::AccountLocked {
                        locked_until,
                        wait_minutes: crate::auth::rate_limit::wait_minutes(locked_until, now),
                    })
                }
            };
        }

        let response = self.start_session(user, input.remember_me).await?;
        info!(user_id = %response.user.id, "User logged in");
        Ok(response)
    }

    /// The `admin` role can only be self-registered while no admin exists.
    #[instrument(skip(self, input), fields(username = %input.username, role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        if self.find_by_username(&input.username).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "username {} already exists",
                input.username
            )));
        }
        if input.role == UserRole::Admin {
            let admins = UserEntity::find()
                .filter(user::Column::Role.eq(UserRole::Admin))
                .count(db)
                .await
                .map_err(ServiceError::db_error)?;
            if admins > 0 {
                return Err(ServiceError::Forbidden(
                    "admin accounts cannot be self-registered".into(),
                ));
            }
        }
        if let Some(store_id) = input.store_id {
            StoreEntity::find_by_id(store_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::not_found("Store", store_id))?;
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            role: Set(input.role),
            store_id: Set(input.store_id),
            status: Set(true),
            login_attempts: Set(0),
            locked_until: Set(None),
            last_login: Set(None),
            refresh_token_hash: Set(None),
            refresh_token_expires_at: Set(None),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    #[instrument(skip(self, input))]
    pub async fn refresh_token(&self, input: RefreshTokenInput) -> Result<LoginResponse, ServiceError> {
        input.validate()?;
        let invalid = || ServiceError::Unauthorized("invalid or expired refresh token".into());

        let user = UserEntity::find()
            .filter(user::Column::RefreshTokenHash.eq(digest_token(&input.refresh_token)))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(invalid)?;
        let expired = user
            .refresh_token_expires_at
            .map_or(true, |expires| expires <= Utc::now());
        if expired || !user.status {
            return Err(invalid());
        }

        let response = self.start_session(user, input.remember_me).await?;
        info!(user_id = %response.user.id, "Tokens refreshed");
        Ok(response)
    }

    /// Unknown usernames get the same message and no token.
    #[instrument(skip(self, input))]
    pub async fn forgot_password(
        &self,
        input: ForgotPasswordInput,
    ) -> Result<ForgotPasswordResponse, ServiceError> {
        input.validate()?;
        let message = "If the account exists, a reset token has been issued".to_string();
        let Some(user) = self.find_by_username(&input.username).await? else {
            return Ok(ForgotPasswordResponse {
                message,
                reset_token: None,
                expires_at: None,
            });
        };

        let now = Utc::now();
        let token = generate_opaque_token();
        let expires_at = now + self.lifetimes.password_reset;
        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.reset_token_hash = Set(Some(digest_token(&token)));
        active.reset_token_expires_at = Set(Some(expires_at));
        active.updated_at = Set(now);
        active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        info!(user_id = %user_id, "Password reset token issued");
        Ok(ForgotPasswordResponse {
            message,
            reset_token: Some(token),
            expires_at: Some(expires_at),
        })
    }

    /// Consumes the reset token and clears any lockout and refresh token.
    #[instrument(skip(self, input))]
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), ServiceError> {
        input.validate()?;
        let invalid = || ServiceError::ValidationError("invalid or expired reset token".into());
        let now = Utc::now();

        let user = UserEntity::find()
            .filter(user::Column::ResetTokenHash.eq(digest_token(&input.token)))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(invalid)?;
        if user.reset_token_expires_at.map_or(true, |expires| expires <= now) {
            return Err(invalid());
        }

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.refresh_token_hash = Set(None);
        active.refresh_token_expires_at = Set(None);
        active.login_attempts = Set(0);
        active.locked_until = Set(None);
        active.updated_at = Set(now);
        active.update(&*self.db).await.map_err(ServiceError::db_error)?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        Ok(self.find_by_id(user_id).await?.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let mut active: user::ActiveModel = self.find_by_id(user_id).await?.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.phone.is_some() {
            active.phone = Set(input.phone);
        }
        active.updated_at = Set(Utc::now());
        let user = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        info!(user_id = %user_id, "Profile updated");
        Ok(user.into())
    }

    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        input.validate()?;
        let user = self.find_by_id(user_id).await?;
        if !verify_password(&input.old_password, &user.password_hash) {
            return Err(ServiceError::ValidationError("old password is incorrect".into()));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_input_enforces_password_length() {
        let input = RegisterInput {
            username: "frontdesk".into(),
            password: "12345".into(),
            name: "Front Desk".into(),
            email: None,
            phone: None,
            role: UserRole::Cashier,
            store_id: None,
        };
        assert!(input.validate().is_err());
        let input = RegisterInput {
            password: "123456".into(),
            ..input
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn unknown_role_fails_to_deserialize() {
        let parsed: Result<RegisterInput, _> = serde_json::from_value(serde_json::json!({
            "username": "ghost",
            "password": "secret1",
            "name": "Ghost",
            "role": "superuser"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn default_lifetimes() {
        let lifetimes = TokenLifetimes::default();
        assert_eq!(lifetimes.refresh, Duration::days(30));
        assert_eq!(lifetimes.password_reset, Duration::hours(1));
    }
}
