use actix_web::{http::StatusCode, HttpResponse};
use serde_derive::Serialize;

/// Envelope returned by the JSON API routes.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T> {
    pub status: String,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

impl<T: serde::Serialize> JsonResponse<T> {
    pub fn ok(message: &str, item: Option<T>) -> Self {
        JsonResponse {
            status: "OK".to_string(),
            message: non_empty(message, "Success"),
            code: 200,
            item,
        }
    }

    pub fn not_valid(message: &str) -> Self {
        Self::error(400, message, "Validation error")
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message, "Internal error")
    }

    pub fn not_implemented(message: &str) -> Self {
        Self::error(501, message, "Not implemented")
    }

    fn error(code: u16, message: &str, fallback: &str) -> Self {
        JsonResponse {
            status: "Error".to_string(),
            message: non_empty(message, fallback),
            code,
            item: None,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(self)
    }
}

fn non_empty(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
