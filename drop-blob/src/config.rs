use drop_core::DropConfigSnapshot;

use crate::{BlobError, BlobResult};

/// Default storage REST API version sent as `x-ms-version`.
pub const DEFAULT_API_VERSION: &str = "2023-11-03";

/// How destination keys are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// Random identifier plus the original extension, probed for collisions
    Unique,
    /// Percent-encoded original name; may overwrite
    Original,
}

impl NamingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "unique" | "guid" | "uuid" => Some(NamingMode::Unique),
            "original" | "sanitized" | "name" => Some(NamingMode::Original),
            _ => None,
        }
    }
}

/// Configuration for upload handling
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single upload (safety guard)
    pub max_file_bytes: u64,

    /// Destination key policy
    pub naming: NamingMode,

    /// Ceiling for the collision probe loop
    pub probe_attempts: u32,

    /// Image downsampling rules
    pub image: ImageRules,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 100 * 1024 * 1024, // 100MB
            naming: NamingMode::Unique,
            probe_attempts: 5,
            image: ImageRules::default(),
        }
    }
}

/// Rules for image payloads
#[derive(Debug, Clone)]
pub struct ImageRules {
    /// When false, images upload untouched
    pub enabled: bool,

    /// Wider images are scaled down to this width
    pub max_width: u32,

    /// Re-encode quality, 0-100
    pub quality: u8,
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            enabled: true,
            max_width: 800,
            quality: 80,
        }
    }
}

impl BlobConfig {
    /// Build from `upload.*` and `image.*` keys, keeping defaults for anything absent.
    pub fn from_snapshot(snapshot: &DropConfigSnapshot) -> BlobResult<Self> {
        let mut config = Self::default();

        if let Some(bytes) = snapshot.get_u64("upload.max_file_bytes") {
            config.max_file_bytes = bytes;
        }
        if let Some(raw) = snapshot.get("upload.naming") {
            config.naming = NamingMode::parse(raw)
                .ok_or_else(|| BlobError::invalid(format!("unknown upload.naming value '{}'", raw)))?;
        }
        if let Some(attempts) = snapshot.get_u32("upload.probe_attempts") {
            config.probe_attempts = attempts.max(1);
        }
        if let Some(enabled) = snapshot.get_bool("image.enabled") {
            config.image.enabled = enabled;
        }
        if let Some(width) = snapshot.get_u32("image.max_width") {
            config.image.max_width = width.max(1);
        }
        if let Some(quality) = snapshot.get_u32("image.quality") {
            config.image.quality = quality.min(100) as u8;
        }

        Ok(config)
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn with_naming(mut self, naming: NamingMode) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_image_rules(mut self, rules: ImageRules) -> Self {
        self.image = rules;
        self
    }

    pub fn without_image_transform(mut self) -> Self {
        self.image.enabled = false;
        self
    }
}

impl ImageRules {
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            enabled: true,
            max_width: max_width.max(1),
            quality: quality.min(100),
        }
    }
}

/// How outbound writes are authorized
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued query-string token appended to every URL
    SasToken(String),
    /// Secret used for per-request shared-key signatures
    AccountKey(String),
    /// Nothing configured; shared-key signing will refuse every request
    Missing,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::SasToken(_) => f.write_str("SasToken(..)"),
            Credentials::AccountKey(_) => f.write_str("AccountKey(..)"),
            Credentials::Missing => f.write_str("Missing"),
        }
    }
}

/// Where objects are written
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub account: String,
    pub container: String,
    /// Overrides `https://<account>.blob.core.windows.net`
    pub endpoint: Option<String>,
    pub api_version: String,
    pub credentials: Credentials,
}

impl StorageConfig {
    pub fn new<A: Into<String>, C: Into<String>>(account: A, container: C) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            endpoint: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            credentials: Credentials::Missing,
        }
    }

    /// Build from `storage.*` keys. Account and container are required; a
    /// missing secret is tolerated here and surfaces per request.
    pub fn from_snapshot(snapshot: &DropConfigSnapshot) -> BlobResult<Self> {
        let account = snapshot
            .get_string("storage.account")
            .ok_or_else(|| BlobError::unconfigured("storage.account"))?;
        let container = snapshot
            .get_string("storage.container")
            .ok_or_else(|| BlobError::unconfigured("storage.container"))?;

        let credentials = if let Some(token) = snapshot.get("storage.sas_token") {
            Credentials::SasToken(token.trim_start_matches('?').to_string())
        } else if let Some(key) = snapshot.get_string("storage.account_key") {
            Credentials::AccountKey(key)
        } else {
            Credentials::Missing
        };

        let mut config = Self::new(account, container).with_credentials(credentials);
        config.endpoint = snapshot.get_string("storage.endpoint");
        if let Some(version) = snapshot.get_string("storage.api_version") {
            config.api_version = version;
        }
        Ok(config)
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_sas_token<S: Into<String>>(self, token: S) -> Self {
        let token: String = token.into();
        self.with_credentials(Credentials::SasToken(token.trim_start_matches('?').to_string()))
    }

    pub fn with_account_key<S: Into<String>>(self, key: S) -> Self {
        self.with_credentials(Credentials::AccountKey(key.into()))
    }

    /// Base URL of the blob service, without a trailing slash.
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account),
        }
    }

    /// Public URL of an object.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint(), self.container, key)
    }

    /// Canonical resource path used in shared-key signatures.
    pub fn canonical_resource(&self, key: &str) -> String {
        format!("/{}/{}/{}", self.account, self.container, key)
    }
}
