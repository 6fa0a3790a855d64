use serde::{Deserialize, Serialize};

/// Receipt returned after successfully storing an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Public URL of the stored object
    pub url: String,
    /// Name the caller uploaded the file under
    pub filename: String,
    /// Content type the object was stored with
    #[serde(rename = "type")]
    pub content_type: String,
    /// Stored byte count
    pub size: u64,
    #[serde(skip)]
    pub key: String,
}

impl UploadReceipt {
    pub fn new<U: Into<String>, K: Into<String>>(url: U, key: K, size: u64) -> Self {
        Self {
            url: url.into(),
            filename: String::new(),
            content_type: "application/octet-stream".to_string(),
            size,
            key: key.into(),
        }
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }
}
