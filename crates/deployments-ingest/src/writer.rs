//! Bounded image writer: copy the image part into a staging file.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::envelope::Part;
use crate::error::IngestError;
use crate::staged::StagedImage;

/// Copies an image part to staging storage without buffering it in memory.
#[derive(Debug, Clone)]
pub struct ImageWriter {
  staging_dir: PathBuf,
  max_image_size: u64,
}

impl ImageWriter {
  pub fn new(staging_dir: impl Into<PathBuf>, max_image_size: u64) -> Self {
    Self {
      staging_dir: staging_dir.into(),
      max_image_size,
    }
  }

  /// Stage `part` and return the number of bytes written.
  ///
  /// The staging file is placed in `slot` as soon as it exists, so the
  /// caller owns its release whether or not the copy succeeds.
  ///
  /// At most `max_image_size + 1` bytes are transferred; reaching that count
  /// means the sender had more than allowed.
  pub async fn write(
    &self,
    mut part: Part,
    slot: &mut Option<StagedImage>,
  ) -> Result<u64, IngestError> {
    require_content_kind(&part)?;

    let staged = slot.insert(
      StagedImage::allocate(&self.staging_dir)
        .map_err(|source| IngestError::StagingUnavailable { source })?,
    );
    let mut file = staged
      .writer()
      .map_err(|source| IngestError::StagingUnavailable { source })?;

    let limit = self.max_image_size.saturating_add(1);
    let mut written: u64 = 0;

    while let Some(chunk) = part.chunk().await.map_err(IngestError::transfer)? {
      let take = chunk.len().min(usize::try_from(limit - written).unwrap_or(usize::MAX));
      file
        .write_all(&chunk[..take])
        .await
        .map_err(IngestError::transfer)?;
      written += take as u64;
      staged.set_size(written);

      if written == limit {
        return Err(IngestError::ArtifactTooLarge {
          limit: self.max_image_size,
        });
      }
    }

    file.flush().await.map_err(IngestError::transfer)?;
    debug!(path = %staged.path().display(), size = written, "image staged");

    Ok(written)
  }
}

/// Fail unless `part` declares a content type.
///
/// Any non-blank header value counts, parseable as a media type or not.
pub(crate) fn require_content_kind(part: &Part) -> Result<(), IngestError> {
  let declared = part
    .headers()
    .get("content-type")
    .is_some_and(|v| !v.as_bytes().iter().all(u8::is_ascii_whitespace));

  if declared {
    Ok(())
  } else {
    Err(IngestError::ArtifactContentKindMissing)
  }
}
