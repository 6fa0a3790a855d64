//! Authorization of outbound storage requests.
//!
//! Two strategies share one shape: given a description of the request,
//! produce the final URL and the headers to send with it.
//!
//! - [`DelegatedToken`] appends a pre-issued query-string token.
//! - [`SharedKey`] signs a canonical description of the request with
//!   HMAC-SHA256 and sends the lowercase hex digest in `Authorization`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use sha2::Sha256;

use crate::config::{Credentials, StorageConfig};
use crate::{BlobError, BlobResult};

type HmacSha256 = Hmac<Sha256>;

/// Only blob type this service writes.
pub const BLOCK_BLOB: &str = "BlockBlob";

const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
const X_MS_DATE: &str = "x-ms-date";
const X_MS_VERSION: &str = "x-ms-version";

/// Everything a strategy needs to know about one outbound request
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Object URL before any credential is attached
    pub url: String,
    /// `/<account>/<container>/<key>`
    pub resource: String,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub blob_type: Option<&'static str>,
}

impl RequestSpec {
    /// Upload of a block blob.
    pub fn put(storage: &StorageConfig, key: &str, content_length: u64, content_type: &str) -> Self {
        Self {
            method: Method::PUT,
            url: storage.object_url(key),
            resource: storage.canonical_resource(key),
            content_length: Some(content_length),
            content_type: Some(content_type.to_string()),
            blob_type: Some(BLOCK_BLOB),
        }
    }

    /// Existence probe.
    pub fn head(storage: &StorageConfig, key: &str) -> Self {
        Self {
            method: Method::HEAD,
            url: storage.object_url(key),
            resource: storage.canonical_resource(key),
            content_length: None,
            content_type: None,
            blob_type: None,
        }
    }
}

/// Final URL and headers for a request
#[derive(Debug, Clone)]
pub struct AuthorizedRequest {
    pub url: String,
    pub headers: HeaderMap,
}

/// Authorizes outbound writes and probes
pub trait AuthStrategy: Send + Sync {
    fn authorize(&self, spec: &RequestSpec) -> BlobResult<AuthorizedRequest>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Pick the strategy matching the configured credentials.
pub fn auth_for(storage: &StorageConfig) -> Arc<dyn AuthStrategy> {
    match &storage.credentials {
        Credentials::SasToken(token) => Arc::new(DelegatedToken::new(token.clone())),
        Credentials::AccountKey(key) => Arc::new(SharedKey::new(
            storage.account.clone(),
            Some(key.clone()),
            storage.api_version.clone(),
        )),
        Credentials::Missing => Arc::new(SharedKey::new(
            storage.account.clone(),
            None,
            storage.api_version.clone(),
        )),
    }
}

/// RFC 1123 timestamp as sent in `x-ms-date`.
pub fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> BlobResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| BlobError::invalid(format!("value '{}' cannot be sent as a header", value)))
}

/// Headers both strategies send.
fn content_headers(spec: &RequestSpec) -> BlobResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(blob_type) = spec.blob_type {
        headers.insert(HeaderName::from_static(X_MS_BLOB_TYPE), HeaderValue::from_static(blob_type));
    }
    if let Some(length) = spec.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(content_type) = &spec.content_type {
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
    }
    Ok(headers)
}

/// Appends a pre-issued access token to the object URL
#[derive(Clone)]
pub struct DelegatedToken {
    token: String,
}

impl DelegatedToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        let token: String = token.into();
        Self {
            token: token.trim_start_matches('?').to_string(),
        }
    }
}

impl AuthStrategy for DelegatedToken {
    fn authorize(&self, spec: &RequestSpec) -> BlobResult<AuthorizedRequest> {
        let separator = if spec.url.contains('?') { '&' } else { '?' };
        Ok(AuthorizedRequest {
            url: format!("{}{}{}", spec.url, separator, self.token),
            headers: content_headers(spec)?,
        })
    }

    fn name(&self) -> &'static str {
        "delegated-token"
    }
}

/// Signs each request with the account's shared secret
#[derive(Clone)]
pub struct SharedKey {
    account: String,
    key: Option<String>,
    api_version: String,
}

impl SharedKey {
    pub fn new<A: Into<String>, V: Into<String>>(account: A, key: Option<String>, api_version: V) -> Self {
        Self {
            account: account.into(),
            key,
            api_version: api_version.into(),
        }
    }

    /// Canonical description of the request, one field per line:
    ///
    /// ```text
    /// VERB
    /// (4 reserved, empty)
    /// Content-Length
    /// Content-Type
    /// (5 reserved, empty)
    /// x-ms-blob-type:<type>      (uploads only)
    /// x-ms-date:<date>
    /// x-ms-version:<version>
    /// /<account>/<container>/<key>
    /// ```
    pub fn string_to_sign(&self, spec: &RequestSpec, date: &str) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(16);
        lines.push(spec.method.as_str().to_string());
        lines.extend(std::iter::repeat(String::new()).take(4));
        lines.push(spec.content_length.map(|l| l.to_string()).unwrap_or_default());
        lines.push(spec.content_type.clone().unwrap_or_default());
        lines.extend(std::iter::repeat(String::new()).take(5));
        if let Some(blob_type) = spec.blob_type {
            lines.push(format!("{}:{}", X_MS_BLOB_TYPE, blob_type));
        }
        lines.push(format!("{}:{}", X_MS_DATE, date));
        lines.push(format!("{}:{}", X_MS_VERSION, self.api_version));
        lines.push(spec.resource.clone());
        lines.join("\n")
    }

    /// `SharedKey <account>:<hex digest>` for `spec` signed at `date`.
    pub fn authorization(&self, spec: &RequestSpec, date: &str) -> BlobResult<String> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| BlobError::unconfigured("storage.account_key"))?;

        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| BlobError::invalid(format!("HMAC key error: {}", e)))?;
        mac.update(self.string_to_sign(spec, date).as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, digest))
    }

    /// Authorize `spec` as if sent at `date`.
    pub fn authorize_at(&self, spec: &RequestSpec, date: &str) -> BlobResult<AuthorizedRequest> {
        let authorization = self.authorization(spec, date)?;

        let mut headers = content_headers(spec)?;
        headers.insert(HeaderName::from_static(X_MS_DATE), header_value(date)?);
        headers.insert(HeaderName::from_static(X_MS_VERSION), header_value(&self.api_version)?);
        headers.insert(AUTHORIZATION, header_value(&authorization)?);

        Ok(AuthorizedRequest {
            url: spec.url.clone(),
            headers,
        })
    }
}

impl AuthStrategy for SharedKey {
    fn authorize(&self, spec: &RequestSpec) -> BlobResult<AuthorizedRequest> {
        self.authorize_at(spec, &rfc1123(Utc::now()))
    }

    fn name(&self) -> &'static str {
        "shared-key"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DATE: &str = "Mon, 19 Oct 2026 10:00:00 GMT";

    fn storage() -> StorageConfig {
        StorageConfig::new("acct", "uploads")
    }

    fn signer() -> SharedKey {
        SharedKey::new("acct", Some("s3cr3t".to_string()), "2023-11-03")
    }

    fn put_spec() -> RequestSpec {
        RequestSpec::put(&storage(), "notes.txt", 10, "text/plain")
    }

    #[test]
    fn string_to_sign_layout() {
        let expected = [
            "PUT", "", "", "", "", "10", "text/plain", "", "", "", "", "",
            "x-ms-blob-type:BlockBlob",
            "x-ms-date:Mon, 19 Oct 2026 10:00:00 GMT",
            "x-ms-version:2023-11-03",
            "/acct/uploads/notes.txt",
        ]
        .join("\n");
        assert_eq!(signer().string_to_sign(&put_spec(), DATE), expected);
    }

    #[test]
    fn head_probe_omits_blob_type_and_content_fields() {
        let spec = RequestSpec::head(&storage(), "x.png");
        let text = signer().string_to_sign(&spec, DATE);
        assert!(text.starts_with("HEAD\n\n\n\n\n\n\n"));
        assert!(!text.contains("x-ms-blob-type"));
    }

    #[test]
    fn signature_is_deterministic() {
        let a = signer().authorization(&put_spec(), DATE).unwrap();
        let b = signer().authorization(&put_spec(), DATE).unwrap();
        assert_eq!(a, b);

        let (prefix, digest) = a.split_once(':').unwrap();
        assert_eq!(prefix, "SharedKey acct");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signature_changes_with_every_signed_field() {
        let base = signer().authorization(&put_spec(), DATE).unwrap();

        let other_size = RequestSpec::put(&storage(), "notes.txt", 11, "text/plain");
        let other_type = RequestSpec::put(&storage(), "notes.txt", 10, "text/csv");
        let other_path = RequestSpec::put(&storage(), "other.txt", 10, "text/plain");

        assert_ne!(base, signer().authorization(&other_size, DATE).unwrap());
        assert_ne!(base, signer().authorization(&other_type, DATE).unwrap());
        assert_ne!(base, signer().authorization(&other_path, DATE).unwrap());
        assert_ne!(
            base,
            signer().authorization(&put_spec(), "Tue, 20 Oct 2026 10:00:00 GMT").unwrap()
        );
    }

    #[test]
    fn shared_key_headers() {
        let authorized = signer().authorize_at(&put_spec(), DATE).unwrap();
        let h = &authorized.headers;

        assert_eq!(authorized.url, "https://acct.blob.core.windows.net/uploads/notes.txt");
        assert_eq!(h.get("x-ms-blob-type").unwrap(), "BlockBlob");
        assert_eq!(h.get("x-ms-date").unwrap(), DATE);
        assert_eq!(h.get("x-ms-version").unwrap(), "2023-11-03");
        assert_eq!(h.get(CONTENT_LENGTH).unwrap(), "10");
        assert_eq!(h.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert!(h.get(AUTHORIZATION).unwrap().to_str().unwrap().starts_with("SharedKey acct:"));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let unsigned = SharedKey::new("acct", None, "2023-11-03");
        let err = unsigned.authorize(&put_spec()).unwrap_err();
        assert!(matches!(err, BlobError::Unconfigured { .. }));
    }

    #[test]
    fn delegated_token_is_appended() {
        let authorized = DelegatedToken::new("?sig=abc").authorize(&put_spec()).unwrap();
        assert_eq!(
            authorized.url,
            "https://acct.blob.core.windows.net/uploads/notes.txt?sig=abc"
        );
        assert_eq!(authorized.headers.get("x-ms-blob-type").unwrap(), "BlockBlob");
        assert!(authorized.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn delegated_token_joins_existing_query() {
        let mut spec = put_spec();
        spec.url.push_str("?comp=block");
        let authorized = DelegatedToken::new("sig=abc").authorize(&spec).unwrap();
        assert!(authorized.url.ends_with("?comp=block&sig=abc"));
    }

    #[test]
    fn auth_for_follows_credentials() {
        assert_eq!(auth_for(&storage().with_sas_token("sig=abc")).name(), "delegated-token");
        assert_eq!(auth_for(&storage().with_account_key("k")).name(), "shared-key");
        assert_eq!(auth_for(&storage()).name(), "shared-key");
    }

    #[test]
    fn rfc1123_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        assert_eq!(rfc1123(at), DATE);
    }
}
