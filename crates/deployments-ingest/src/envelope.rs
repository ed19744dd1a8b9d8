//! Envelope parsing: content type → boundary → part stream.

use bytes::Bytes;
use futures::Stream;

use crate::error::{BoxError, IngestError};

/// One named part of the envelope. Its bytes can be read once, in order.
pub type Part = multer::Field<'static>;

/// Forward-only sequence of parts from one request body.
pub struct PartStream {
  inner: multer::Multipart<'static>,
}

impl PartStream {
  /// Pull the next part. Any unread bytes of the previous part are skipped.
  pub async fn next_part(&mut self) -> Result<Option<Part>, multer::Error> {
    self.inner.next_field().await
  }
}

/// Extract the multipart boundary from a media type.
///
/// Only the `boundary` parameter matters; the media type itself is not
/// checked beyond being parseable.
pub fn parse_boundary(content_type: &str) -> Result<String, IngestError> {
  let media_type: mime::Mime =
    content_type
      .parse()
      .map_err(|e: mime::FromStrError| IngestError::MalformedEnvelope {
        message: format!("invalid content type '{}': {}", content_type, e),
      })?;

  match media_type.get_param(mime::BOUNDARY) {
    Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_string()),
    _ => Err(IngestError::MalformedEnvelope {
      message: format!("content type '{}' has no boundary", content_type),
    }),
  }
}

/// Open a part stream over a request body.
pub fn open<S, O, E>(content_type: &str, body: S) -> Result<PartStream, IngestError>
where
  S: Stream<Item = Result<O, E>> + Send + 'static,
  O: Into<Bytes> + 'static,
  E: Into<BoxError> + 'static,
{
  let boundary = parse_boundary(content_type)?;
  Ok(PartStream {
    inner: multer::Multipart::new(body, boundary),
  })
}
