//! # Configuration
//!
//! A flat string key/value store. Keys are dotted lowercase paths
//! (`storage.account`, `image.max_width`); values are kept as strings and
//! parsed by whoever reads them from a [`DropConfigSnapshot`].
//!
//! ```rust
//! use drop_core::DropConfig;
//!
//! let mut config = DropConfig::new();
//! config.set("storage.account", "acct");
//! config.set("image.max_width", "1024");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("storage.account"), Some("acct"));
//! assert_eq!(snapshot.get_u32("image.max_width"), Some(1024));
//! ```
//!
//! ## Environment overrides
//!
//! `load_env` maps prefixed variables onto keys, so
//! `BLOBDROP__STORAGE__ACCOUNT=acct` becomes `storage.account = "acct"`.
//! Reading the environment happens once at start-up; the typed settings
//! built from the snapshot are what the request path sees.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DropConfig {
    values: HashMap<String, String>,
}

impl DropConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Load every `PREFIX`-ed variable from the process environment.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    /// Load prefixed `(name, value)` pairs; returns how many keys were set.
    ///
    /// `PREFIX__IMAGE__MAX_WIDTH` → `image.max_width`
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };
            let normalized = stripped.to_lowercase().replace("__", ".");
            if normalized.is_empty() {
                continue;
            }
            tracing::debug!(key = %normalized, "config value loaded from environment");
            self.set(normalized, value);
            loaded += 1;
        }
        loaded
    }

    pub fn snapshot(&self) -> DropConfigSnapshot {
        DropConfigSnapshot::new(self.values.clone())
    }
}

/// Read-only copy of the store handed to settings builders.
#[derive(Debug, Clone, Default)]
pub struct DropConfigSnapshot {
    map: HashMap<String, String>,
}

impl DropConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Non-empty value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse::<u32>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Split a delimited value into trimmed, non-empty items.
    pub fn get_list(&self, key: &str, separator: char) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(separator)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
