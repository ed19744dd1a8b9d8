//! Integration tests for the image upload route.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use deployments_api::{IMAGES_PATH, router};
use deployments_config::IngestLimits;
use deployments_images::{Error as StoreError, FsImageStore, ImageData, ImageStore, SoftwareImageMeta};
use deployments_ingest::ImageIngestor;
use tower::ServiceExt;

const BOUNDARY: &str = "upload-test-boundary";

fn multipart(fields: &[(&str, &str)], firmware: Option<(&str, &[u8])>) -> Vec<u8> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  if let Some((content_type, data)) = firmware {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"firmware\"; filename=\"fw.img\"\r\nContent-Type: {content_type}\r\n\r\n"
      )
      .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
  body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(IMAGES_PATH)
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
  json["error"].as_str().unwrap_or_default().to_string()
}

struct Fixture {
  store_dir: tempfile::TempDir,
  staging_dir: tempfile::TempDir,
  app: axum::Router,
}

fn fixture(limits: IngestLimits) -> Fixture {
  let store_dir = tempfile::tempdir().unwrap();
  let staging_dir = tempfile::tempdir().unwrap();
  let store = Arc::new(FsImageStore::new(store_dir.path()));
  let app = router(ImageIngestor::new(store, staging_dir.path(), limits));
  Fixture {
    store_dir,
    staging_dir,
    app,
  }
}

fn count(dir: &tempfile::TempDir) -> usize {
  std::fs::read_dir(dir.path()).unwrap().count()
}

const VALID: &[(&str, &str)] = &[("name", "v1"), ("device_type", "qemu"), ("checksum", "abc")];

#[tokio::test]
async fn test_upload_creates_image() {
  let f = fixture(IngestLimits::default());

  let response = f
    .app
    .oneshot(upload_request(multipart(
      VALID,
      Some(("application/octet-stream", b"hello")),
    )))
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::CREATED);
  let location = response
    .headers()
    .get(header::LOCATION)
    .unwrap()
    .to_str()
    .unwrap()
    .to_string();
  let id = location
    .strip_prefix(&format!("{IMAGES_PATH}/"))
    .expect("location under images path");

  let stored = FsImageStore::new(f.store_dir.path()).stored(id).await.unwrap();
  assert_eq!(stored.size, 5);
  assert_eq!(stored.meta.name.as_deref(), Some("v1"));
  assert_eq!(count(&f.staging_dir), 0);
}

#[tokio::test]
async fn test_missing_required_field_is_bad_request() {
  let f = fixture(IngestLimits::default());

  let response = f
    .app
    .oneshot(upload_request(multipart(
      &[("name", "v1")],
      Some(("application/octet-stream", b"hello")),
    )))
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert!(error_message(response).await.starts_with("validating metadata"));
  assert_eq!(count(&f.store_dir), 0);
  assert_eq!(count(&f.staging_dir), 0);
}

#[tokio::test]
async fn test_oversized_image_is_bad_request() {
  let f = fixture(IngestLimits {
    max_image_size: 4,
    ..Default::default()
  });

  let response = f
    .app
    .oneshot(upload_request(multipart(
      VALID,
      Some(("application/octet-stream", b"hello")),
    )))
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert_eq!(count(&f.store_dir), 0);
  assert_eq!(count(&f.staging_dir), 0);
}

#[tokio::test]
async fn test_missing_firmware_is_bad_request() {
  let f = fixture(IngestLimits::default());

  let response = f
    .app
    .oneshot(upload_request(multipart(VALID, None)))
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert_eq!(
    error_message(response).await,
    "request does not contain firmware part"
  );
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
  let f = fixture(IngestLimits::default());

  let request = Request::builder()
    .method("POST")
    .uri(IMAGES_PATH)
    .body(Body::from(multipart(VALID, None)))
    .unwrap();
  let response = f.app.oneshot(request).await.unwrap();

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct UnavailableStore;

#[async_trait]
impl ImageStore for UnavailableStore {
  async fn create(&self, _image: ImageData, _meta: SoftwareImageMeta) -> Result<String, StoreError> {
    Err(StoreError::Io(std::io::Error::other("storage offline")))
  }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
  let staging_dir = tempfile::tempdir().unwrap();
  let app = router(ImageIngestor::new(
    Arc::new(UnavailableStore),
    staging_dir.path(),
    IngestLimits::default(),
  ));

  let response = app
    .oneshot(upload_request(multipart(
      VALID,
      Some(("application/octet-stream", b"hello")),
    )))
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert!(error_message(response).await.contains("storage offline"));
  assert_eq!(count(&staging_dir), 0);
}
