//! Azure Blob Storage client over the blob REST API.
//!
//! Only the two calls the upload pipeline needs are implemented:
//!   `HEAD /<container>/<key>` -> 200 when the object exists
//!   `PUT  /<container>/<key>` -> 201/200 on success, error body otherwise
//!
//! Both are authorized by the configured [`AuthStrategy`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ETAG;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::auth::{auth_for, AuthStrategy, RequestSpec};
use crate::config::StorageConfig;
use crate::{BlobError, BlobResult, BlobStore, ByteStream, PutResult};

/// Production blob store talking to an Azure storage account
#[derive(Clone)]
pub struct AzureBlobStore {
    client: Client,
    storage: StorageConfig,
    auth: Arc<dyn AuthStrategy>,
}

impl AzureBlobStore {
    /// Create a store using the strategy implied by the configured credentials.
    pub fn new(storage: StorageConfig) -> BlobResult<Self> {
        let auth = auth_for(&storage);
        Self::with_auth(storage, auth)
    }

    /// Create a store with an explicit auth strategy.
    pub fn with_auth(storage: StorageConfig, auth: Arc<dyn AuthStrategy>) -> BlobResult<Self> {
        let client = Client::builder().build().map_err(BlobError::backend)?;

        info!(
            account = %storage.account,
            container = %storage.container,
            endpoint = %storage.endpoint(),
            auth = auth.name(),
            "blob store initialized"
        );

        Ok(Self {
            client,
            storage,
            auth,
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let authorized = self.auth.authorize(&RequestSpec::head(&self.storage, key))?;

        let response = self
            .client
            .head(&authorized.url)
            .headers(authorized.headers)
            .send()
            .await
            .map_err(BlobError::backend)?;

        let status = response.status();
        debug!(key, status = status.as_u16(), "existence probe");
        Ok(status == StatusCode::OK)
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let spec = RequestSpec::put(&self.storage, key, content_length, content_type);
        let authorized = self.auth.authorize(&spec)?;

        let response = self
            .client
            .put(&authorized.url)
            .headers(authorized.headers)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(BlobError::backend)?;

        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response_text(key, response.text().await);

        if !status.is_success() {
            error!(
                key,
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or(""),
                body = %body,
                "storage rejected upload"
            );
            return Err(BlobError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            key,
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or(""),
            "storage accepted upload"
        );

        Ok(PutResult {
            etag,
            size_bytes: content_length,
        })
    }

    fn public_url(&self, key: &str) -> String {
        self.storage.object_url(key)
    }
}

/// Response text, or a marker naming the read failure when the body is lost.
fn response_text<E: std::fmt::Display>(key: &str, read: Result<String, E>) -> String {
    match read {
        Ok(text) => text,
        Err(e) => {
            warn!(key, error = %e, "failed to read storage response body");
            format!("<unreadable response body: {}>", e)
        }
    }
}
