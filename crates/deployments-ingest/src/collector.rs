//! Metadata collection: drain parts into a [`SoftwareImageMeta`] until the
//! `firmware` part shows up.

use deployments_images::SoftwareImageMeta;
use tracing::debug;

use crate::envelope::{Part, PartStream};
use crate::error::IngestError;

/// Name of the part carrying the image payload.
pub const IMAGE_FIELD: &str = "firmware";

/// Metadata attributes recognized in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
  Name,
  YoctoId,
  DeviceType,
  Checksum,
  Description,
}

impl MetaField {
  pub fn form_name(self) -> &'static str {
    match self {
      MetaField::Name => "name",
      MetaField::YoctoId => "yocto_id",
      MetaField::DeviceType => "device_type",
      MetaField::Checksum => "checksum",
      MetaField::Description => "description",
    }
  }

  /// The record attribute this field fills.
  fn slot(self, meta: &mut SoftwareImageMeta) -> &mut Option<String> {
    match self {
      MetaField::Name => &mut meta.name,
      MetaField::YoctoId => &mut meta.yocto_id,
      MetaField::DeviceType => &mut meta.device_type,
      MetaField::Checksum => &mut meta.checksum,
      MetaField::Description => &mut meta.description,
    }
  }
}

/// What a part is, judged by its form name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  Meta(MetaField),
  Image,
  Unrecognized,
}

impl FormField {
  pub fn from_name(name: Option<&str>) -> Self {
    match name {
      Some("name") => FormField::Meta(MetaField::Name),
      Some("yocto_id") => FormField::Meta(MetaField::YoctoId),
      Some("device_type") => FormField::Meta(MetaField::DeviceType),
      Some("checksum") => FormField::Meta(MetaField::Checksum),
      Some("description") => FormField::Meta(MetaField::Description),
      Some(IMAGE_FIELD) => FormField::Image,
      _ => FormField::Unrecognized,
    }
  }
}

/// Validated metadata and the untouched image part.
pub struct CollectedMeta {
  pub meta: SoftwareImageMeta,
  pub image_part: Part,
}

enum CollectState {
  /// Pulling parts and filling the record.
  Collecting,
  /// The image part arrived; the record is not validated yet.
  ImagePartSeen(Part),
}

/// Collect metadata fields until the image part, then validate.
///
/// Values longer than `max_meta_size` are truncated to that many bytes.
/// Unrecognized parts are skipped. On success the image part is returned
/// with none of its bytes read, and no later parts are pulled.
pub async fn collect_meta(
  parts: &mut PartStream,
  max_meta_size: u64,
) -> Result<CollectedMeta, IngestError> {
  let mut meta = SoftwareImageMeta::default();
  let mut state = CollectState::Collecting;

  loop {
    state = match state {
      CollectState::Collecting => {
        let mut part = match parts.next_part().await {
          Ok(Some(part)) => part,
          Ok(None) => return Err(IngestError::MissingArtifactPart { source: None }),
          Err(e) => return Err(IngestError::MissingArtifactPart { source: Some(e) }),
        };

        match FormField::from_name(part.name()) {
          FormField::Meta(field) => {
            let value = read_value(&mut part, field, max_meta_size).await?;
            *field.slot(&mut meta) = Some(value);
            CollectState::Collecting
          }
          FormField::Image => CollectState::ImagePartSeen(part),
          FormField::Unrecognized => {
            debug!(field = ?part.name(), "skipping unrecognized form field");
            CollectState::Collecting
          }
        }
      }
      CollectState::ImagePartSeen(image_part) => {
        meta
          .validate()
          .map_err(|source| IngestError::MetadataValidationFailed { source })?;
        return Ok(CollectedMeta { meta, image_part });
      }
    };
  }
}

/// Read a metadata value, stopping at `limit` bytes.
async fn read_value(part: &mut Part, field: MetaField, limit: u64) -> Result<String, IngestError> {
  let limit = usize::try_from(limit).unwrap_or(usize::MAX);
  let mut value = Vec::new();

  while value.len() < limit {
    let chunk = part
      .chunk()
      .await
      .map_err(|source| IngestError::MetadataReadFailed {
        field: field.form_name(),
        source,
      })?;

    match chunk {
      Some(chunk) => {
        let take = chunk.len().min(limit - value.len());
        value.extend_from_slice(&chunk[..take]);
      }
      None => break,
    }
  }

  if value.len() == limit {
    debug!(field = field.form_name(), limit, "metadata value reached limit, rest discarded");
  }

  Ok(String::from_utf8_lossy(&value).into_owned())
}
