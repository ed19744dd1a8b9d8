//! Staged image files.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::CleanupError;

const STAGING_PREFIX: &str = "firmware-";

/// A uniquely named temporary file holding one upload's image bytes.
///
/// The file is removed exactly once: by [`StagedImage::release`], or on
/// drop if the owner never got that far (e.g. the ingestion future was
/// cancelled). Either way a failed removal is logged.
#[derive(Debug)]
pub struct StagedImage {
  file: Option<NamedTempFile>,
  path: PathBuf,
  size: u64,
}

impl StagedImage {
  /// Allocate a new staging file in `dir`.
  pub fn allocate(dir: &Path) -> Result<Self, std::io::Error> {
    let file = tempfile::Builder::new()
      .prefix(STAGING_PREFIX)
      .tempfile_in(dir)?;
    let path = file.path().to_path_buf();
    debug!(path = %path.display(), "staging file allocated");

    Ok(Self {
      file: Some(file),
      path,
      size: 0,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Bytes written so far.
  pub fn size(&self) -> u64 {
    self.size
  }

  pub(crate) fn set_size(&mut self, size: u64) {
    self.size = size;
  }

  /// A second async handle on the staging file, positioned at its start.
  pub(crate) fn writer(&self) -> Result<tokio::fs::File, std::io::Error> {
    Ok(tokio::fs::File::from_std(self.handle()?.as_file().try_clone()?))
  }

  /// A fresh read handle on the staged bytes, positioned at the start.
  pub(crate) fn reader(&self) -> Result<tokio::fs::File, std::io::Error> {
    Ok(tokio::fs::File::from_std(self.handle()?.reopen()?))
  }

  fn handle(&self) -> Result<&NamedTempFile, std::io::Error> {
    self
      .file
      .as_ref()
      .ok_or_else(|| std::io::Error::other("staged image already released"))
  }

  /// Close the handle and delete the file.
  pub fn release(mut self) -> Result<(), CleanupError> {
    self.release_inner()
  }

  fn release_inner(&mut self) -> Result<(), CleanupError> {
    match self.file.take() {
      Some(file) => {
        file.close().map_err(|source| CleanupError {
          path: self.path.clone(),
          source,
        })?;
        debug!(path = %self.path.display(), "staging file released");
        Ok(())
      }
      None => Ok(()),
    }
  }
}

impl Drop for StagedImage {
  fn drop(&mut self) {
    if let Err(e) = self.release_inner() {
      warn!(path = %e.path.display(), error = %e.source, "failed to release staged image");
    }
  }
}
