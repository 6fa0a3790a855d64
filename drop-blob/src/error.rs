use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while preparing or performing an upload
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Blob size {size} exceeds maximum {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("Storage is not configured: {setting} is missing")]
    Unconfigured { setting: String },

    #[error("Storage rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("No free object key after {attempts} attempts")]
    KeyExhausted { attempts: u32 },

    #[error("Image processing failed: {message}")]
    Image { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a missing-configuration error
    pub fn unconfigured<S: Into<String>>(setting: S) -> Self {
        Self::Unconfigured {
            setting: setting.into(),
        }
    }

    /// Create an image codec error
    pub fn image<S: Into<String>>(message: S) -> Self {
        Self::Image {
            message: message.into(),
        }
    }
}
