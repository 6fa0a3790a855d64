use async_trait::async_trait;

use crate::{BlobResult, ByteStream};

/// Blob storage operations the upload pipeline needs from a backend
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether an object already lives under `key`
    async fn exists(&self, key: &str) -> BlobResult<bool>;

    /// Store a blob from a stream of exactly `content_length` bytes
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Public URL of the object stored under `key`
    fn public_url(&self, key: &str) -> String;
}

/// Answers "is this key taken?" for the collision probe
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn exists(&self, key: &str) -> BlobResult<bool>;
}

/// Borrows a store as its existence probe
pub struct StoreProbe<'a>(pub &'a dyn BlobStore);

#[async_trait]
impl ExistenceProbe for StoreProbe<'_> {
    async fn exists(&self, key: &str) -> BlobResult<bool> {
        self.0.exists(key).await
    }
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}
