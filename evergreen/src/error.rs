use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::v1::response::ApiResponse;

#[derive(Error, Debug)]
pub enum EvergreenError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment processor error: {0}")]
    Payment(String),

    #[error("Request already in flight")]
    InFlight,

    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for EvergreenError {
    /// Errors raised outside a handler body (extractor rejections) still use
    /// the v1 envelope.
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EvergreenError>;
