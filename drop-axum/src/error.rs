use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drop_blob::BlobError;
use drop_core::errors::DropError;
use tracing::{error, warn};

#[derive(Debug)]
pub struct DropAxumError(pub anyhow::Error);

impl From<anyhow::Error> for DropAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<DropError> for DropAxumError {
    fn from(e: DropError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<BlobError> for DropAxumError {
    fn from(e: BlobError) -> Self {
        Self(classify_blob_error(e).into_anyhow())
    }
}

/// Place a pipeline error in the request-level taxonomy.
pub fn classify_blob_error(err: BlobError) -> DropError {
    match err {
        BlobError::Invalid { message } => DropError::bad_request(message),
        BlobError::TooLarge { max, .. } => {
            DropError::payload_too_large(format!("File exceeds maximum size of {} bytes", max))
        }
        BlobError::Unconfigured { setting } => {
            DropError::configuration(format!("Storage is not configured: {} is missing", setting))
        }
        BlobError::Rejected { body, .. } => {
            DropError::upstream(format!("Failed to upload file to storage: {}", body))
        }
        other => {
            let message = other.to_string();
            DropError::upstream(message).with_source(anyhow::Error::new(other))
        }
    }
}

impl IntoResponse for DropAxumError {
    fn into_response(self) -> Response {
        // Errors are rendered as plain text with the kind's status code
        let drop = DropError::normalize(self.0);
        let status = StatusCode::from_u16(drop.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if drop.kind.is_client_error() {
            warn!(status = drop.code(), kind = drop.name(), message = %drop.message, "request refused");
        } else {
            error!(status = drop.code(), kind = drop.name(), error = ?drop, "request failed");
        }

        (status, drop.client_message().to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_core::ErrorKind;

    #[test]
    fn rejection_keeps_storage_body() {
        let drop = classify_blob_error(BlobError::Rejected {
            status: 403,
            body: "<Error><Code>AuthFailed</Code></Error>".to_string(),
        });
        assert_eq!(drop.kind, ErrorKind::Upstream);
        assert_eq!(
            drop.client_message(),
            "Failed to upload file to storage: <Error><Code>AuthFailed</Code></Error>"
        );
    }

    #[test]
    fn kinds_follow_cause() {
        let kind = |e: BlobError| classify_blob_error(e).kind;
        assert_eq!(kind(BlobError::invalid("empty")), ErrorKind::BadRequest);
        assert_eq!(kind(BlobError::TooLarge { size: 2, max: 1 }), ErrorKind::PayloadTooLarge);
        assert_eq!(kind(BlobError::unconfigured("storage.account_key")), ErrorKind::Configuration);
        assert_eq!(kind(BlobError::KeyExhausted { attempts: 5 }), ErrorKind::Upstream);
        assert_eq!(
            kind(BlobError::from(std::io::Error::other("disk gone"))),
            ErrorKind::Upstream
        );
    }

    #[test]
    fn response_is_plain_text_with_status() {
        let res = DropAxumError::from(DropError::method_not_allowed("Only POST requests are allowed"))
            .into_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let content_type = res.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }
}
