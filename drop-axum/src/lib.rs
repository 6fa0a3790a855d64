//! drop-axum: HTTP surface for blobdrop.
//!
//! One method-dispatched endpoint accepts `multipart/form-data` uploads and
//! hands the `file` part to a [`drop_blob::UploadAdapter`].

pub mod app;
pub mod middlewares;
pub mod state;
pub mod upload;
mod error;
pub use error::{classify_blob_error, DropAxumError};
pub use state::DropAxumState;

pub use app::{axum, AxumApp};
pub use middlewares::OriginPolicy;
