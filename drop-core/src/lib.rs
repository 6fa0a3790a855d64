//! drop-core: shared building blocks for the blobdrop upload service.
//!
//! Nothing in here knows about HTTP or storage. The error taxonomy is
//! transport-agnostic (the server crate decides how to render it) and the
//! configuration store is a flat string key/value map that other crates
//! derive their typed settings from.

pub mod config;
pub mod errors;

pub use config::{DropConfig, DropConfigSnapshot};
pub use errors::{DropError, ErrorKind};
