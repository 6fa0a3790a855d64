//! Pulls the `file` part out of a multipart body and spools it to disk.
//!
//! Chunks are written to a request-scoped temporary file as they arrive, so
//! memory stays flat regardless of upload size. The file is deleted when the
//! [`SpoolFile`] is dropped.

use std::path::{Path, PathBuf};

use axum::body::Body;
use drop_blob::UploadBody;
use drop_core::errors::DropError;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Form field carrying the upload
pub const FILE_FIELD: &str = "file";

/// Content type assumed when the part does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Temporary file holding one spooled part
#[derive(Debug)]
pub struct SpoolFile {
    path: PathBuf,
    size: u64,
}

impl SpoolFile {
    async fn create(dir: &Path) -> std::io::Result<(Self, tokio::fs::File)> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("blobdrop_{}", uuid::Uuid::new_v4()));
        let file = tokio::fs::File::create(&path).await?;
        Ok((Self { path, size: 0 }, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stream the spooled bytes back out.
    pub async fn open(&self) -> std::io::Result<UploadBody> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(UploadBody::Stream {
            stream: Box::pin(ReaderStream::new(file)),
            size: self.size,
        })
    }
}

impl Drop for SpoolFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove spool file");
            }
        }
    }
}

/// The `file` part after spooling
#[derive(Debug)]
pub struct SpooledUpload {
    pub filename: String,
    pub content_type: String,
    pub file: SpoolFile,
}

/// Where and how much to spool
#[derive(Debug, Clone)]
pub struct SpoolConfig {
    pub dir: PathBuf,
    pub max_file_bytes: u64,
}

impl SpoolConfig {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            dir: std::env::temp_dir(),
            max_file_bytes,
        }
    }

    pub fn with_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.dir = dir.into();
        self
    }
}

fn parse_error(e: multer::Error) -> DropError {
    DropError::bad_request(format!("Failed to parse multipart data: {}", e))
}

fn spool_error(e: std::io::Error) -> DropError {
    DropError::upstream(format!("Failed to spool upload: {}", e)).with_source(anyhow::Error::new(e))
}

/// Spool the `file` part. `Ok(None)` when the body has no usable file part.
pub async fn spool_file_field(
    body: Body,
    boundary: String,
    config: &SpoolConfig,
) -> Result<Option<SpooledUpload>, DropError> {
    let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

    while let Some(mut field) = multipart.next_field().await.map_err(parse_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Ok(None),
        };
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let (mut spool, mut file) = SpoolFile::create(&config.dir).await.map_err(spool_error)?;

        while let Some(chunk) = field.chunk().await.map_err(parse_error)? {
            spool.size += chunk.len() as u64;
            if spool.size > config.max_file_bytes {
                return Err(DropError::payload_too_large(format!(
                    "File exceeds maximum size of {} bytes",
                    config.max_file_bytes
                )));
            }
            file.write_all(&chunk).await.map_err(spool_error)?;
        }
        file.flush().await.map_err(spool_error)?;
        drop(file);

        debug!(filename = %filename, size = spool.size, path = %spool.path.display(), "file part spooled");

        return Ok(Some(SpooledUpload {
            filename,
            content_type,
            file: spool,
        }));
    }

    Ok(None)
}
