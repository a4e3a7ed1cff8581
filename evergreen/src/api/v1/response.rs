//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint returns an [`ApiResponse<T>`] envelope with three
//! optional top-level fields:
//!
//! ```json
//! {
//!   "data": { ... },                 // present on success, absent on error
//!   "meta": { "total": 42 },         // optional list metadata
//!   "error": { "code": "not_found", "message": "..." }  // present on error
//! }
//! ```
//!
//! ## ID Formats
//!
//! - **memberId**: nanoid, 21 characters (e.g. `"V1StGXR8_Z5jdHi6B-myT"`)
//! - **memorialId**: opaque string owned by the memorial service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::EvergreenError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request or failed validation. HTTP 400.
    InvalidRequest,
    /// A premium subscription payment was declined. HTTP 402.
    PaymentRequired,
    /// The memorial has no such member. HTTP 404.
    NotFound,
    /// The change conflicts with the current tree (e.g. would close a
    /// parent cycle). HTTP 409.
    Conflict,
    /// Unexpected server-side failure. Details are never leaked. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::PaymentRequired => write!(f, "payment_required"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

impl From<ApiError> for EvergreenError {
    /// Rebuild a local error from an envelope received over the wire.
    fn from(err: ApiError) -> Self {
        match err.code {
            ErrorCode::InvalidRequest => EvergreenError::Validation(err.message),
            ErrorCode::PaymentRequired => EvergreenError::PaymentDeclined(err.message),
            ErrorCode::NotFound => EvergreenError::NotFound(err.message),
            ErrorCode::Conflict => EvergreenError::Conflict(err.message),
            ErrorCode::InternalError => EvergreenError::Remote {
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: err.message,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Total number of items in the list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Canonical v1 API response envelope.
///
/// On success, `data` is present and `error` is absent. On error, `error` is
/// present and `data` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::OK,
        }
    }

    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self {
            data: Some(data),
            meta: Some(meta),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Resource created response (HTTP 201).
    pub fn created(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::CREATED,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    /// Unwrap a decoded envelope into its payload or error.
    pub fn into_result(self) -> Result<T, EvergreenError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        self.data.ok_or_else(|| EvergreenError::Remote {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            message: "Response envelope carried neither data nor error".to_string(),
        })
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<EvergreenError> for ApiResponse<T> {
    /// Convert an [`EvergreenError`] into a v1 [`ApiResponse`].
    ///
    /// For `internal_error` responses a generic message is returned and the
    /// real error is logged via `tracing::error!`.
    fn from(err: EvergreenError) -> Self {
        match err {
            EvergreenError::NotFound(msg) => ApiResponse::error(ErrorCode::NotFound, msg),

            EvergreenError::Validation(msg) => ApiResponse::error(ErrorCode::InvalidRequest, msg),

            EvergreenError::Json(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            EvergreenError::UrlParse(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid URL: {e}"))
            }

            EvergreenError::Conflict(msg) => ApiResponse::error(ErrorCode::Conflict, msg),

            EvergreenError::InFlight => {
                ApiResponse::error(ErrorCode::Conflict, "Request already in flight")
            }

            EvergreenError::PaymentDeclined(msg) => {
                ApiResponse::error(ErrorCode::PaymentRequired, msg)
            }

            EvergreenError::Remote { status, message } => match status {
                400 => ApiResponse::error(ErrorCode::InvalidRequest, message),
                402 => ApiResponse::error(ErrorCode::PaymentRequired, message),
                404 => ApiResponse::error(ErrorCode::NotFound, message),
                409 => ApiResponse::error(ErrorCode::Conflict, message),
                _ => {
                    tracing::error!(status, message = %message, "Remote error mapped to v1 response");
                    ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
                }
            },

            ref internal @ (EvergreenError::Database(_)
            | EvergreenError::Http(_)
            | EvergreenError::Io(_)
            | EvergreenError::Payment(_)
            | EvergreenError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_serializes_without_error() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json.get("error").is_none());
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::NotFound, "gone");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["message"], "gone");
    }

    #[test]
    fn success_with_meta_carries_total() {
        let resp = ApiResponse::success_with_meta(vec![1, 2, 3], ResponseMeta { total: Some(3) });
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["meta"]["total"], 3);
    }

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PaymentRequired.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_value(&ErrorCode::PaymentRequired).expect("serialize");
        assert_eq!(json, "payment_required");
        assert_eq!(ErrorCode::InvalidRequest.to_string(), "invalid_request");
    }

    #[test]
    fn created_response_has_201_status() {
        let resp = ApiResponse::created("new-member");
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    #[test]
    fn declined_payment_maps_to_payment_required() {
        let resp: ApiResponse<()> = EvergreenError::PaymentDeclined("card declined".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::PaymentRequired);
        assert_eq!(resp.status, StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn internal_errors_do_not_leak() {
        for err in [
            EvergreenError::Internal("secret debug info".into()),
            EvergreenError::Payment("processor at 10.0.0.3 refused".into()),
        ] {
            let resp: ApiResponse<()> = err.into();
            let api_err = resp.error.as_ref().expect("error");
            assert_eq!(api_err.code, ErrorCode::InternalError);
            assert_eq!(api_err.message, "An internal error occurred");
        }
    }

    #[test]
    fn decoded_envelope_round_trips_errors() {
        let json = r#"{"error":{"code":"conflict","message":"would create a cycle"}}"#;
        let decoded: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        match decoded.into_result() {
            Err(EvergreenError::Conflict(msg)) => assert_eq!(msg, "would create a cycle"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let decoded: ApiResponse<u32> = serde_json::from_str(r#"{"data":7}"#).unwrap();
        assert_eq!(decoded.into_result().unwrap(), 7);
    }
}
