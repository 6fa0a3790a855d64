use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::NamingMode;
use crate::{BlobError, BlobResult, ExistenceProbe};

/// Strategy for choosing the destination key of an upload
#[async_trait]
pub trait KeyStrategy: Send + Sync {
    async fn resolve_key(&self, original_name: &str, probe: &dyn ExistenceProbe) -> BlobResult<String>;
}

/// Build the strategy for a configured naming mode.
pub fn key_strategy_for(mode: NamingMode, probe_attempts: u32) -> Box<dyn KeyStrategy> {
    match mode {
        NamingMode::Unique => Box::new(UniqueKeys::new(probe_attempts)),
        NamingMode::Original => Box::new(OriginalName),
    }
}

/// Extension of `name` after the last dot, if any.
pub fn file_extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// `<uuid>.<ext>` or bare `<uuid>` when there is no extension.
pub fn candidate_key(id: &Uuid, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", id.hyphenated(), urlencoding::encode(ext)),
        None => id.hyphenated().to_string(),
    }
}

/// Percent-encoded original name. Deterministic; the same name overwrites.
#[derive(Debug, Clone, Default)]
pub struct OriginalName;

#[async_trait]
impl KeyStrategy for OriginalName {
    async fn resolve_key(&self, original_name: &str, _probe: &dyn ExistenceProbe) -> BlobResult<String> {
        if original_name.is_empty() {
            return Err(BlobError::invalid("file name is empty"));
        }
        // `.` and `..` are path segments, not object names
        if original_name.chars().all(|c| c == '.') {
            return Err(BlobError::invalid(format!("'{}' is not a valid file name", original_name)));
        }
        Ok(urlencoding::encode(original_name).into_owned())
    }
}

/// Random v4 identifier plus the original extension, probed until free
#[derive(Debug, Clone)]
pub struct UniqueKeys {
    max_attempts: u32,
}

impl UniqueKeys {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for UniqueKeys {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl KeyStrategy for UniqueKeys {
    async fn resolve_key(&self, original_name: &str, probe: &dyn ExistenceProbe) -> BlobResult<String> {
        let extension = file_extension(original_name);

        for attempt in 1..=self.max_attempts {
            let candidate = candidate_key(&Uuid::new_v4(), extension);
            if !probe.exists(&candidate).await? {
                debug!(key = %candidate, attempt, "resolved unique key");
                return Ok(candidate);
            }
            warn!(key = %candidate, attempt, "generated key already taken");
        }

        Err(BlobError::KeyExhausted {
            attempts: self.max_attempts,
        })
    }
}
