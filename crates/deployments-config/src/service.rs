use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::limits::IngestLimits;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Top-level service configuration.
///
/// ```json
/// {
///   "listen_addr": "0.0.0.0:8080",
///   "storage_dir": "/var/lib/deployments/images",
///   "staging_dir": null,
///   "limits": { "max_meta_size": 10485760, "max_image_size": 10737418240 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  pub listen_addr: SocketAddr,
  /// Where persisted images live. Resolved against the data directory when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub storage_dir: Option<PathBuf>,
  /// Where uploads are staged. The OS temporary directory when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub staging_dir: Option<PathBuf>,
  pub limits: IngestLimits,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      listen_addr: DEFAULT_LISTEN_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
      storage_dir: None,
      staging_dir: None,
      limits: IngestLimits::default(),
    }
  }
}

impl ServiceConfig {
  /// Parse and validate a JSON configuration document.
  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    let config: ServiceConfig = serde_json::from_str(content)?;
    config.limits.validate()?;
    Ok(config)
  }

  /// Read and parse a JSON configuration file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  /// Storage directory, falling back to `{data_dir}/images`.
  pub fn storage_dir_or(&self, data_dir: &Path) -> PathBuf {
    self
      .storage_dir
      .clone()
      .unwrap_or_else(|| data_dir.join("images"))
  }

  /// Staging directory, falling back to the OS temporary directory.
  pub fn staging_dir_or_default(&self) -> PathBuf {
    self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
  }
}
