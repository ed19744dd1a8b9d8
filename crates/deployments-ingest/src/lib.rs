//! Deployments Ingest
//!
//! This crate accepts one multipart upload (metadata fields followed by a
//! `firmware` part) and turns it into a validated metadata record plus a
//! bounded, staged copy of the image, which is then handed to an
//! [`ImageStore`](deployments_images::ImageStore).
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │      envelope        │──▶│      collector       │──▶│       writer         │
//! │  boundary → parts    │   │  fields until        │   │  firmware → staged   │
//! │                      │   │  `firmware`, validate│   │  file, ≤ max + 1     │
//! └──────────────────────┘   └──────────────────────┘   └──────────────────────┘
//!                                                                  │
//!                                                                  ▼
//!                                                       ┌──────────────────────┐
//!                                                       │     ImageStore       │
//!                                                       └──────────────────────┘
//! ```
//!
//! [`ImageIngestor`] sequences the stages and releases the staged file on
//! every exit path, including when the ingestion future is dropped.
//!
//! The image payload is never held in memory; metadata values are held up
//! to the configured ceiling and silently truncated beyond it.

mod collector;
mod envelope;
mod error;
mod ingestor;
mod staged;
mod writer;

#[cfg(test)]
mod testing;

pub use collector::{CollectedMeta, FormField, IMAGE_FIELD, MetaField, collect_meta};
pub use envelope::{Part, PartStream, open, parse_boundary};
pub use error::{CleanupError, ErrorClass, IngestError};
pub use ingestor::ImageIngestor;
pub use staged::StagedImage;
pub use writer::ImageWriter;
