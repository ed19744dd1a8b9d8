use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Error, ImageData, ImageStore, SoftwareImageMeta};

const IMAGE_FILE: &str = "image";
const META_FILE: &str = "meta.json";

/// Metadata record written next to each stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
  pub id: String,
  #[serde(flatten)]
  pub meta: SoftwareImageMeta,
  pub size: u64,
  /// Hex SHA-256 of the stored bytes.
  pub sha256: String,
  pub modified: DateTime<Utc>,
}

/// Filesystem-based image store.
///
/// Images are stored in a directory structure:
/// ```text
/// {root}/
/// └── 0b7e2a52-6c1f-4f0c-9a55-3b0d4a4c6a0e/
///     ├── image
///     └── meta.json
/// ```
pub struct FsImageStore {
  root: PathBuf,
}

impl FsImageStore {
  /// Create a new filesystem store with the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn image_dir(&self, id: &str) -> PathBuf {
    self.root.join(id)
  }

  /// Read back the metadata record of a stored image.
  pub async fn stored(&self, id: &str) -> Result<StoredImage, Error> {
    let content = fs::read_to_string(self.image_dir(id).join(META_FILE)).await?;
    Ok(serde_json::from_str(&content)?)
  }

  async fn write_image(
    &self,
    dir: &Path,
    id: &str,
    image: ImageData,
    meta: SoftwareImageMeta,
  ) -> Result<StoredImage, Error> {
    fs::create_dir_all(dir).await?;

    let mut file = File::create(dir.join(IMAGE_FILE)).await?;
    let mut stream = image.stream;
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
      let bytes = chunk?;
      hasher.update(&bytes);
      file.write_all(&bytes).await?;
      written += bytes.len() as u64;
    }

    file.flush().await?;

    if written != image.size {
      return Err(Error::SizeMismatch {
        expected: image.size,
        actual: written,
      });
    }

    let stored = StoredImage {
      id: id.to_string(),
      meta,
      size: written,
      sha256: format!("{:x}", hasher.finalize()),
      modified: Utc::now(),
    };
    fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&stored)?).await?;

    Ok(stored)
  }
}

#[async_trait]
impl ImageStore for FsImageStore {
  async fn create(&self, image: ImageData, meta: SoftwareImageMeta) -> Result<String, Error> {
    let id = Uuid::new_v4().to_string();
    let dir = self.image_dir(&id);

    match self.write_image(&dir, &id, image, meta).await {
      Ok(stored) => {
        info!(image_id = %id, size = stored.size, sha256 = %stored.sha256, "image stored");
        Ok(id)
      }
      Err(e) => {
        if let Err(cleanup) = fs::remove_dir_all(&dir).await
          && cleanup.kind() != std::io::ErrorKind::NotFound
        {
          warn!(image_id = %id, error = %cleanup, "failed to remove partial image");
        }
        Err(e)
      }
    }
  }
}
