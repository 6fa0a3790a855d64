//! # drop-blob: upload pipeline for Azure Blob Storage
//!
//! `drop-blob` takes one file, optionally downsamples it when it is an image,
//! picks the object key, authorizes the request and PUTs it into a container.
//! It knows nothing about HTTP servers; `drop-axum` feeds it from multipart
//! requests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drop_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let storage = StorageConfig::new("myaccount", "uploads").with_sas_token("sv=2023-11-03&sig=abc");
//! let store = AzureBlobStore::new(storage)?;
//! let adapter = UploadAdapter::new(store, BlobConfig::default());
//!
//! let put = BlobPut::new("hello.txt").with_content_type("text/plain");
//! let receipt = adapter
//!     .put(put, UploadBody::Bytes(bytes::Bytes::from_static(b"Hello, world!")))
//!     .await?;
//!
//! println!("stored at {}", receipt.url);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  UploadAdapter  │  ← transform, naming, receipt
//! ├─────────────────┤
//! │   BlobStore     │  ← HEAD probe + PUT
//! ├─────────────────┤
//! │  AuthStrategy   │  ← delegated token or shared key
//! └─────────────────┘
//! ```

pub mod adapter;
pub mod auth;
mod azure_store;
mod config;
mod error;
pub mod naming;
mod receipt;
pub mod store;
pub mod transform;
mod types;

pub use adapter::UploadAdapter;
pub use auth::{AuthStrategy, AuthorizedRequest, DelegatedToken, RequestSpec, SharedKey};
pub use azure_store::AzureBlobStore;
pub use config::{BlobConfig, Credentials, ImageRules, NamingMode, StorageConfig, DEFAULT_API_VERSION};
pub use error::{BlobError, BlobResult};
pub use naming::{KeyStrategy, OriginalName, UniqueKeys};
pub use receipt::UploadReceipt;
pub use store::{BlobStore, ExistenceProbe, PutResult, StoreProbe};
pub use transform::{ImageCodec, ImageTransform, RasterCodec, TransformOutcome};
pub use types::{BlobPut, ByteStream, UploadBody};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AzureBlobStore, BlobConfig, BlobError, BlobPut, BlobResult, BlobStore, ByteStream,
        StorageConfig, UploadAdapter, UploadBody, UploadReceipt,
    };
}
