//! Deployments API
//!
//! HTTP routes for the deployments service. The upload route streams the
//! request body straight into an [`ImageIngestor`]; the router does not cap
//! the body size because the ingestor enforces its own ceilings.

mod error;
mod images;

pub use error::ApiError;
pub use images::IMAGES_PATH;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use deployments_ingest::ImageIngestor;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
  pub ingestor: ImageIngestor,
}

/// Build the service router.
pub fn router(ingestor: ImageIngestor) -> Router {
  Router::new()
    .route(IMAGES_PATH, post(images::upload_image))
    .layer(DefaultBodyLimit::disable())
    .with_state(ApiState { ingestor })
}
