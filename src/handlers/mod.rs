pub mod batch;
pub mod cache;
pub mod health;
pub mod search;

use axum::{http::StatusCode, Json};

use crate::models::batch::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>, code: Option<&str>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.map(str::to_string),
        }),
    )
}
