//! Image upload handler.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::ApiState;
use crate::error::ApiError;

pub const IMAGES_PATH: &str = "/api/0.0.1/images";

/// `POST /api/0.0.1/images`
///
/// Expects `multipart/form-data` with metadata fields followed by a
/// `firmware` part. Responds `201 Created` with the new image's location.
pub async fn upload_image(
  State(state): State<ApiState>,
  headers: HeaderMap,
  body: Body,
) -> Result<Response, ApiError> {
  let content_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();

  let id = state
    .ingestor
    .ingest(content_type, body.into_data_stream())
    .await?;

  let location = format!("{}/{}", IMAGES_PATH, id);
  info!(image_id = %id, %location, "image created");

  Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}
