//! Error rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deployments_ingest::{ErrorClass, IngestError};
use serde::Serialize;

/// An error response: a status code and a `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
  pub status: StatusCode,
  pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
  error: &'a str,
}

impl ApiError {
  pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
    }
  }
}

impl From<IngestError> for ApiError {
  fn from(e: IngestError) -> Self {
    let status = match e.class() {
      ErrorClass::Client => StatusCode::BAD_REQUEST,
      ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Self::new(status, e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = Json(ErrorBody {
      error: &self.message,
    });
    (self.status, body).into_response()
  }
}
