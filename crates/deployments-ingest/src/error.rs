//! Ingestion errors.

use std::path::PathBuf;

use deployments_images::ValidationError;

/// Boxed error from the inbound body or the part parser.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Who is at fault for a failed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Malformed, oversized or invalid input.
  Client,
  /// Staging or persistence failure.
  Server,
}

/// Errors that terminate an ingestion. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
  /// The content type could not be parsed or has no boundary.
  #[error("malformed envelope: {message}")]
  MalformedEnvelope { message: String },

  /// The part stream ended or broke before a `firmware` part was seen.
  #[error("request does not contain firmware part")]
  MissingArtifactPart {
    #[source]
    source: Option<multer::Error>,
  },

  /// A metadata value could not be read.
  #[error("failed to obtain value for {field}: {source}")]
  MetadataReadFailed {
    field: &'static str,
    #[source]
    source: multer::Error,
  },

  /// The collected metadata failed validation.
  #[error("validating metadata: {source}")]
  MetadataValidationFailed {
    #[source]
    source: ValidationError,
  },

  /// The `firmware` part declared no content type.
  #[error("firmware part has no content type")]
  ArtifactContentKindMissing,

  /// The image is larger than the configured ceiling.
  #[error("image file too large: limit is {limit} bytes")]
  ArtifactTooLarge { limit: u64 },

  /// Reading or staging the image bytes failed below the ceiling.
  #[error("image transfer failed: {source}")]
  ArtifactTransferFailed {
    #[source]
    source: BoxError,
  },

  /// No staging file could be allocated.
  #[error("staging unavailable: {source}")]
  StagingUnavailable {
    #[source]
    source: std::io::Error,
  },

  /// The image store rejected the image.
  #[error("persisting image failed: {source}")]
  PersistenceFailed {
    #[source]
    source: deployments_images::Error,
  },
}

impl IngestError {
  pub fn class(&self) -> ErrorClass {
    match self {
      IngestError::MalformedEnvelope { .. }
      | IngestError::MissingArtifactPart { .. }
      | IngestError::MetadataReadFailed { .. }
      | IngestError::MetadataValidationFailed { .. }
      | IngestError::ArtifactContentKindMissing
      | IngestError::ArtifactTooLarge { .. } => ErrorClass::Client,
      IngestError::ArtifactTransferFailed { .. }
      | IngestError::StagingUnavailable { .. }
      | IngestError::PersistenceFailed { .. } => ErrorClass::Server,
    }
  }

  pub(crate) fn transfer(source: impl Into<BoxError>) -> Self {
    IngestError::ArtifactTransferFailed {
      source: source.into(),
    }
  }
}

/// Failure to remove a staged image. Logged, never returned to the caller.
#[derive(Debug, thiserror::Error)]
#[error("failed to release staged image {path}: {source}")]
pub struct CleanupError {
  pub path: PathBuf,
  #[source]
  pub source: std::io::Error,
}
