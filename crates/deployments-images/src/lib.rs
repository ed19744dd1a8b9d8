//! Deployments Images
//!
//! This crate provides the software image model and the persistence trait
//! the ingestion pipeline hands validated uploads to.
//!
//! [`SoftwareImageMeta`] is the metadata record sent alongside an image, and
//! [`SoftwareImageMeta::validate`] is the rule set it must satisfy before the
//! image bytes are accepted.
//!
//! The [`ImageStore`] trait defines the durable storage backend. Image bytes
//! are handed over as a stream so no backend needs the whole image in memory.

mod fs;
mod meta;

pub use fs::{FsImageStore, StoredImage};
pub use meta::{SoftwareImageMeta, ValidationError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for image data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Error type for image storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The streamed image did not have the announced length.
  #[error("image size mismatch: expected {expected} bytes, got {actual}")]
  SizeMismatch { expected: u64, actual: u64 },

  /// Failed to encode the stored metadata.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Image bytes handed to an [`ImageStore`].
pub struct ImageData {
  /// The image payload, read once from the start.
  pub stream: ByteStream,
  /// Number of bytes the stream yields.
  pub size: u64,
}

/// Persistence sink for uploaded images.
///
/// Implementations own durable storage (filesystem, object storage, etc.)
/// and any integrity checks against the metadata.
#[async_trait]
pub trait ImageStore: Send + Sync {
  /// Persist an image and its metadata, returning the new image id.
  async fn create(&self, image: ImageData, meta: SoftwareImageMeta) -> Result<String, Error>;
}
