//! Wires configuration, storage client and HTTP surface into one service.

use anyhow::{Context, Result};
use drop_axum::{axum, AxumApp, OriginPolicy};
use drop_blob::{AzureBlobStore, BlobConfig, StorageConfig, UploadAdapter};
use drop_core::DropConfig;
use tracing::info;

/// Prefix of the environment variables read at start-up.
pub const ENV_PREFIX: &str = "BLOBDROP__";

/// Defaults overlaid by the process environment.
pub fn load_config() -> DropConfig {
    let mut config = DropConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3030");
    let loaded = config.load_env(ENV_PREFIX);
    info!(loaded, prefix = ENV_PREFIX, "configuration loaded");
    config
}

pub fn build(config: &DropConfig) -> Result<AxumApp> {
    let snapshot = config.snapshot();

    let storage = StorageConfig::from_snapshot(&snapshot).context("invalid storage settings")?;
    let blob = BlobConfig::from_snapshot(&snapshot).context("invalid upload settings")?;
    let origins = OriginPolicy::from_setting(snapshot.get("cors.allowed_origins"));

    info!(
        naming = ?blob.naming,
        max_width = blob.image.max_width,
        quality = blob.image.quality,
        max_file_bytes = blob.max_file_bytes,
        restricted_origins = origins.is_restricted(),
        "upload settings"
    );

    let store = AzureBlobStore::new(storage).context("failed to create storage client")?;
    let adapter = UploadAdapter::new(store, blob);

    let mut ax = axum(adapter).with_origins(origins);
    if let Some(dir) = snapshot.get("upload.spool_dir") {
        ax = ax.with_spool_dir(dir);
    }
    Ok(ax)
}

/// `host:port` to bind.
pub fn listen_addr(config: &DropConfig) -> String {
    let snapshot = config.snapshot();
    let host = snapshot.get("http.host").unwrap_or("127.0.0.1");
    let port = snapshot.get("http.port").unwrap_or("3030");
    format!("{host}:{port}")
}
