//! # Errors
//!
//! Request-level error taxonomy for the upload pipeline.
//!
//! - every error carries a kind that owns its status code and name
//! - can be carried through `anyhow::Error` and recovered with a downcast
//! - transport-agnostic (the HTTP crate decides how to render it)
//!
//! | kind               | status | meaning                                  |
//! |--------------------|--------|------------------------------------------|
//! | `BadRequest`       | 400    | caller input violates a precondition     |
//! | `Forbidden`        | 403    | origin policy rejected the caller        |
//! | `MethodNotAllowed` | 405    | anything but POST on the upload endpoint |
//! | `PayloadTooLarge`  | 413    | file exceeds the configured ceiling      |
//! | `Configuration`    | 500    | a required setting or secret is missing  |
//! | `Upstream`         | 500    | the storage service failed or refused    |

use std::fmt;

use anyhow::Error as AnyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    Forbidden,        // 403
    MethodNotAllowed, // 405
    PayloadTooLarge,  // 413
    Configuration,    // 500
    Upstream,         // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::Configuration => 500,
            ErrorKind::Upstream => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::Configuration => "Configuration",
            ErrorKind::Upstream => "Upstream",
        }
    }

    /// Whether the caller can fix the problem by changing the request.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

/// A structured pipeline error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct DropError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl DropError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Turn any error into a DropError:
    /// - if it's already a DropError anywhere in the chain, keep its kind and message
    /// - otherwise wrap as Upstream
    pub fn normalize(err: AnyError) -> DropError {
        if let Some(found) = err.chain().find_map(|e| e.downcast_ref::<DropError>()) {
            return DropError::new(found.kind, found.message.clone());
        }
        DropError::new(ErrorKind::Upstream, err.to_string()).with_source(err)
    }

    /// The text returned to the caller. Never includes the inner `source`.
    pub fn client_message(&self) -> &str {
        &self.message
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, msg)
    }
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, msg)
    }
}

impl fmt::Display for DropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for DropError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(DropError::bad_request("x").code(), 400);
        assert_eq!(DropError::forbidden("x").code(), 403);
        assert_eq!(DropError::method_not_allowed("x").code(), 405);
        assert_eq!(DropError::payload_too_large("x").code(), 413);
        assert_eq!(DropError::configuration("x").code(), 500);
        assert_eq!(DropError::upstream("x").code(), 500);
    }

    #[test]
    fn normalize_keeps_kind_through_context() {
        let err = DropError::bad_request("Invalid Content-Type")
            .into_anyhow()
            .context("validating request");
        let normalized = DropError::normalize(err);
        assert_eq!(normalized.kind, ErrorKind::BadRequest);
        assert_eq!(normalized.client_message(), "Invalid Content-Type");
    }

    #[test]
    fn normalize_wraps_foreign_errors_as_upstream() {
        let normalized = DropError::normalize(anyhow::anyhow!("connection reset"));
        assert_eq!(normalized.kind, ErrorKind::Upstream);
        assert!(normalized.client_message().contains("connection reset"));
        assert!(normalized.source.is_some());
    }
}
