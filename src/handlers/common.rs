use crate::{
    errors::{ApiError, ServiceError},
    services::PageRequest,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// `{ "message": ... }` acknowledgement
pub fn message_response(message: impl Into<String>) -> Response {
    success_response(MessageResponse {
        message: message.into(),
    })
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Page selection shared by list endpoints; `limit` is accepted as an alias.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaginationParams {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Start of `date` in UTC.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Exclusive upper bound covering the whole of `date`.
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date.succ_opt().unwrap_or(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(day_start(date).to_rfc3339(), "2024-01-31T00:00:00+00:00");
        assert_eq!(day_end(date).to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn limit_alias_sets_page_size() {
        let params: PaginationParams = serde_json::from_value(serde_json::json!({
            "page": 3,
            "limit": 25
        }))
        .unwrap();
        assert_eq!(params.page_request(), PageRequest::new(Some(3), Some(25)));
    }
}
