use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use crate::{BlobError, BlobResult};

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// What the caller told us about the file
#[derive(Debug, Clone)]
pub struct BlobPut {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

impl BlobPut {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Payload handed to the adapter.
///
/// `Stream` keeps large files off the heap; `Bytes` is used once the
/// payload had to be materialized anyway (image transform, tests).
pub enum UploadBody {
    Bytes(Bytes),
    Stream { stream: ByteStream, size: u64 },
}

impl UploadBody {
    pub fn len(&self) -> u64 {
        match self {
            UploadBody::Bytes(bytes) => bytes.len() as u64,
            UploadBody::Stream { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_stream(self) -> ByteStream {
        match self {
            UploadBody::Bytes(bytes) => Box::pin(futures::stream::once(async move { Ok(bytes) })),
            UploadBody::Stream { stream, .. } => stream,
        }
    }

    /// Read the whole payload into memory, refusing to grow past `limit`.
    pub async fn collect(self, limit: u64) -> BlobResult<Bytes> {
        match self {
            UploadBody::Bytes(bytes) => Ok(bytes),
            UploadBody::Stream { mut stream, size } => {
                let mut buf = Vec::with_capacity(size.min(limit) as usize);
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if (buf.len() + chunk.len()) as u64 > limit {
                        return Err(BlobError::TooLarge {
                            size: (buf.len() + chunk.len()) as u64,
                            max: limit,
                        });
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            UploadBody::Stream { size, .. } => f.debug_struct("Stream").field("size", size).finish(),
        }
    }
}
