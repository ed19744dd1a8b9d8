use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ceiling for a single metadata value (10 MiB).
pub const DEFAULT_MAX_META_SIZE: u64 = 1024 * 1024 * 10;

/// Ceiling for the image payload (10 GiB).
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 1024 * 1024 * 1024 * 10;

/// Per-request byte ceilings enforced by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestLimits {
  /// Metadata values longer than this are truncated, not rejected.
  pub max_meta_size: u64,
  /// Image payloads longer than this are rejected.
  pub max_image_size: u64,
}

impl Default for IngestLimits {
  fn default() -> Self {
    Self {
      max_meta_size: DEFAULT_MAX_META_SIZE,
      max_image_size: DEFAULT_MAX_IMAGE_SIZE,
    }
  }
}

impl IngestLimits {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_meta_size == 0 {
      return Err(ConfigError::Invalid(
        "limits.max_meta_size must be greater than zero".to_string(),
      ));
    }
    if self.max_image_size == 0 {
      return Err(ConfigError::Invalid(
        "limits.max_image_size must be greater than zero".to_string(),
      ));
    }
    Ok(())
  }
}
