use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{user::UserProfile, AuthRouterExt, AuthUser},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::users::{
        ChangePasswordInput, ForgotPasswordInput, ForgotPasswordResponse, LoginInput,
        LoginResponse, RefreshTokenInput, RegisterInput, ResetPasswordInput, UpdateProfileInput,
    },
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;

/// Public account endpoints, mounted under both `/auth` and `/api/auth`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh-token", post(refresh_token))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Endpoints acting on the caller's own account.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/change-password",
            post(change_password).put(change_password),
        )
        .with_auth()
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Unknown user or wrong password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account disabled", body = crate::errors::ErrorResponse),
        (status = 429, description = "Account locked", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let response = state
        .services
        .users
        .login(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "User registered", body = UserProfile),
        (status = 400, description = "Invalid input or username taken", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let profile = state
        .services
        .users
        .register(payload)
        .await
        .map_err(map_service_error)?;
    info!(user_id = %profile.id, "User registered");
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    request_body = RefreshTokenInput,
    responses(
        (status = 200, description = "Tokens rotated", body = LoginResponse),
        (status = 401, description = "Unknown or expired refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let response = state
        .services
        .users
        .refresh_token(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordInput,
    responses(
        (status = 200, description = "Reset token issued when the user exists", body = ForgotPasswordResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let response = state
        .services
        .users
        .forgot_password(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordInput,
    responses(
        (status = 200, description = "Password reset", body = super::common::MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .users
        .reset_password(payload)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Password has been reset"))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Caller's profile", body = UserProfile),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .users
        .get_profile(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let profile = state
        .services
        .users
        .update_profile(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/change-password",
    request_body = ChangePasswordInput,
    responses(
        (status = 200, description = "Password changed", body = super::common::MessageResponse),
        (status = 400, description = "Old password incorrect", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<ChangePasswordInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .users
        .change_password(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Password changed"))
}
