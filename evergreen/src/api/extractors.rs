use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::EvergreenError;

/// JSON body extractor whose rejections come back as `invalid_request`
/// envelopes instead of axum's plain-text errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(EvergreenError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for EvergreenError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> EvergreenError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            match extract_missing_field(&message) {
                Some(field) => EvergreenError::Validation(format!("Missing required field: {field}")),
                None => EvergreenError::Validation(format!("Invalid JSON: {message}")),
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            EvergreenError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => {
            EvergreenError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            EvergreenError::Internal("Failed to read request body".to_string())
        }
        _ => EvergreenError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_extracted() {
        let message = "Failed to deserialize the JSON body into the target type: missing field `name` at line 1 column 2";
        assert_eq!(extract_missing_field(message), Some("name"));
        assert_eq!(extract_missing_field("expected value"), None);
    }
}
