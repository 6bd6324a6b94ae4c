//! JSON envelope for the non-streaming endpoints.

use axum::Json;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = -1;

/// `{status_code, status_msg, data}`; `data` is null on error
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status_code: i32,
    pub status_msg: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status_code: STATUS_OK,
            status_msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_ERROR,
            status_msg: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
