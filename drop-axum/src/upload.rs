use axum::{
    extract::{Request, State},
    http::{header, Method},
    Json,
};
use drop_blob::{BlobPut, UploadReceipt};
use drop_core::errors::DropError;
use tracing::info;

use crate::middlewares::spool_file_field;
use crate::{DropAxumError, DropAxumState};

/// Single upload endpoint, mounted as the router fallback so every path lands here.
pub async fn upload(
    State(state): State<DropAxumState>,
    request: Request,
) -> Result<Json<UploadReceipt>, DropAxumError> {
    if request.method() != Method::POST {
        return Err(DropError::method_not_allowed("Only POST requests are allowed").into());
    }

    let boundary = multipart_boundary(&request)?;

    let upload = spool_file_field(request.into_body(), boundary, &state.spool)
        .await?
        .ok_or_else(|| DropError::bad_request("File not provided or invalid"))?;

    info!(
        filename = %upload.filename,
        content_type = %upload.content_type,
        size = upload.file.size(),
        "upload received"
    );

    let put = BlobPut::new(upload.filename.clone())
        .with_content_type(upload.content_type.clone())
        .with_size(upload.file.size());
    let body = upload
        .file
        .open()
        .await
        .map_err(|e| DropError::upstream(format!("Failed to read spooled upload: {}", e)))?;

    let receipt = state.adapter.put(put, body).await?;

    // spool file lives until the store has consumed the stream
    drop(upload);

    Ok(Json(receipt))
}

fn multipart_boundary(request: &Request) -> Result<String, DropError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.contains("multipart/form-data") {
        return Err(DropError::bad_request("Invalid Content-Type"));
    }

    multer::parse_boundary(content_type).map_err(|_| DropError::bad_request("Invalid Content-Type"))
}
