//! Ingestion orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use deployments_config::IngestLimits;
use deployments_images::{Error as StoreError, ImageData, ImageStore};
use futures::{Stream, StreamExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, instrument, warn};

use crate::collector::collect_meta;
use crate::envelope;
use crate::error::{BoxError, ErrorClass, IngestError};
use crate::staged::StagedImage;
use crate::writer::{ImageWriter, require_content_kind};

/// Where an ingestion is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngestStage {
  ParsingEnvelope,
  CollectingMetadata,
  AwaitingImagePart,
  StreamingImage,
  Persisting,
}

/// Runs the ingestion pipeline for one request at a time.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent requests.
#[derive(Clone)]
pub struct ImageIngestor {
  store: Arc<dyn ImageStore>,
  writer: ImageWriter,
  limits: IngestLimits,
}

impl ImageIngestor {
  /// Create an ingestor that stages uploads in `staging_dir` and hands them
  /// to `store`.
  pub fn new(
    store: Arc<dyn ImageStore>,
    staging_dir: impl Into<PathBuf>,
    limits: IngestLimits,
  ) -> Self {
    Self {
      store,
      writer: ImageWriter::new(staging_dir, limits.max_image_size),
      limits,
    }
  }

  /// Ingest one multipart request body and return the new image id.
  ///
  /// The staging file, if one was allocated, is removed before this returns,
  /// whatever the outcome. If the returned future is dropped midway the file
  /// is removed on drop.
  #[instrument(name = "image_ingest", skip(self, body))]
  pub async fn ingest<S, O, E>(&self, content_type: &str, body: S) -> Result<String, IngestError>
  where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<BoxError> + 'static,
  {
    let mut stage = IngestStage::ParsingEnvelope;
    let mut staged: Option<StagedImage> = None;

    let result = self.run(content_type, body, &mut stage, &mut staged).await;

    if let Some(image) = staged.take()
      && let Err(e) = image.release()
    {
      warn!(path = %e.path.display(), error = %e.source, "failed to release staged image");
    }

    match &result {
      Ok((id, size)) => info!(image_id = %id, size, "image ingested"),
      Err(e) => match e.class() {
        ErrorClass::Client => warn!(?stage, error = %e, "image rejected"),
        ErrorClass::Server => error!(?stage, error = %e, "image ingest failed"),
      },
    }

    result.map(|(id, _)| id)
  }

  async fn run<S, O, E>(
    &self,
    content_type: &str,
    body: S,
    stage: &mut IngestStage,
    staged: &mut Option<StagedImage>,
  ) -> Result<(String, u64), IngestError>
  where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<BoxError> + 'static,
  {
    let mut parts = envelope::open(content_type, body)?;

    enter(stage, IngestStage::CollectingMetadata);
    let collected = collect_meta(&mut parts, self.limits.max_meta_size).await?;
    enter(stage, IngestStage::AwaitingImagePart);
    require_content_kind(&collected.image_part)?;

    enter(stage, IngestStage::StreamingImage);
    let size = self.writer.write(collected.image_part, staged).await?;

    enter(stage, IngestStage::Persisting);
    let image = match staged.as_ref() {
      Some(staged) => staged
        .reader()
        .map_err(|source| IngestError::StagingUnavailable { source })?,
      None => {
        return Err(IngestError::StagingUnavailable {
          source: std::io::Error::other("image was not staged"),
        });
      }
    };
    let data = ImageData {
      stream: Box::pin(ReaderStream::new(image).map(|r| r.map_err(StoreError::Io))),
      size,
    };

    let id = self
      .store
      .create(data, collected.meta)
      .await
      .map_err(|source| IngestError::PersistenceFailed { source })?;

    debug!(image_id = %id, "image persisted");
    Ok((id, size))
  }
}

fn enter(stage: &mut IngestStage, next: IngestStage) {
  debug!(from = ?*stage, to = ?next, "ingest stage");
  *stage = next;
}
