//! Deployments Config
//!
//! This crate contains the serializable configuration types for the
//! deployments service. Configuration is loaded from a JSON file and may be
//! overridden by command line flags in the binary.
//!
//! Every field is optional in the file; anything left out takes its default.

mod error;
mod limits;
mod service;

pub use error::ConfigError;
pub use limits::{DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_META_SIZE, IngestLimits};
pub use service::{DEFAULT_LISTEN_ADDR, ServiceConfig};
