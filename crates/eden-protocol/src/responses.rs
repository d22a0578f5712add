use eden_core::error::{FieldError, ValidationError};
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";
pub const ACK_MESSAGE: &str = "Alert received and broadcasted.";

/// Gateway → producer acknowledgment.
/// Wire: `{ "status": "success", "message": "Alert received and broadcasted." }`
///
/// Means "accepted and dispatch attempted", never "delivered to N viewers".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    pub status: String,
    pub message: String,
}

impl IngestAck {
    pub fn accepted() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: ACK_MESSAGE.to_string(),
        }
    }
}

/// Error body shared by every JSON endpoint.
/// Wire: `{ "status": "error", "code": "VALIDATION_ERROR", "message": "...",
/// "errors": [{"field": "confidence", "reason": "..."}] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            code: code.to_string(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn validation(err: ValidationError) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            code: "VALIDATION_ERROR".to_string(),
            message: "alert failed validation".to_string(),
            errors: err.errors,
        }
    }
}
