//! Test helpers for building multipart request bodies.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use deployments_images::{Error as StoreError, ImageData, ImageStore, SoftwareImageMeta};
use futures::{Stream, StreamExt};

const BOUNDARY: &str = "X-DEPLOYMENTS-BOUNDARY";

/// Builder for a `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
  body: Vec<u8>,
  unterminated: bool,
}

impl MultipartBody {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn content_type(&self) -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
  }

  /// Append a text field without a content type.
  pub fn field(self, name: &str, value: &str) -> Self {
    self.part(name, None, value.as_bytes())
  }

  /// Append a file part with a content type.
  pub fn file(self, name: &str, content_type: &str, data: &[u8]) -> Self {
    self.part(name, Some(content_type), data)
  }

  /// Append a file part without a content type header.
  pub fn untyped_file(self, name: &str, data: &[u8]) -> Self {
    self.part(name, None, data)
  }

  fn part(mut self, name: &str, content_type: Option<&str>, data: &[u8]) -> Self {
    let mut head = format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"", BOUNDARY, name);
    if content_type.is_some() {
      head.push_str("; filename=\"image.bin\"");
    }
    head.push_str("\r\n");
    if let Some(ct) = content_type {
      head.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    head.push_str("\r\n");

    self.body.extend_from_slice(head.as_bytes());
    self.body.extend_from_slice(data);
    self.body.extend_from_slice(b"\r\n");
    self
  }

  fn bytes(&self) -> Vec<u8> {
    let mut body = self.body.clone();
    if !self.unterminated {
      body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    }
    body
  }

  /// Leave the closing boundary off, as if the client went away.
  pub fn truncated(mut self) -> Self {
    self.unterminated = true;
    self
  }

  /// The body as a stream of `chunk_size` byte chunks.
  pub fn stream(
    &self,
    chunk_size: usize,
  ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + use<> {
    let chunks: Vec<Result<Bytes, std::io::Error>> = self
      .bytes()
      .chunks(chunk_size.max(1))
      .map(|c| Ok(Bytes::copy_from_slice(c)))
      .collect();
    futures::stream::iter(chunks)
  }

  /// The body followed by a transport error instead of an orderly end.
  pub fn stream_then_error(
    &self,
    chunk_size: usize,
  ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + use<> {
    self.stream(chunk_size).chain(futures::stream::once(async {
      // Pending once first, so the parser has to come back for the error.
      tokio::task::yield_now().await;
      Err(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
      ))
    }))
  }
}

/// Image store double that records what it was handed.
#[derive(Clone, Default)]
pub struct RecordingStore {
  inner: Arc<std::sync::Mutex<Vec<(SoftwareImageMeta, Vec<u8>, u64)>>>,
  calls: Arc<AtomicUsize>,
  fail: bool,
}

impl RecordingStore {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Metadata, bytes and announced size of each stored image.
  pub fn stored(&self) -> Vec<(SoftwareImageMeta, Vec<u8>, u64)> {
    self.inner.lock().unwrap().clone()
  }
}

#[async_trait]
impl ImageStore for RecordingStore {
  async fn create(&self, image: ImageData, meta: SoftwareImageMeta) -> Result<String, StoreError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      return Err(StoreError::Io(std::io::Error::other("store unavailable")));
    }

    let mut bytes = Vec::new();
    let mut stream = image.stream;
    while let Some(chunk) = stream.next().await {
      bytes.extend_from_slice(&chunk?);
    }
    self.inner.lock().unwrap().push((meta, bytes, image.size));
    Ok(format!("image-{}", n))
  }
}

/// Number of entries in a directory.
pub fn entries(dir: &std::path::Path) -> usize {
  std::fs::read_dir(dir).unwrap().count()
}
