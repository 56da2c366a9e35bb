//! Multipart parsing for archive uploads

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use explainer_core::AppError;

use crate::constants::{MAX_UPLOAD_TEXT_FIELD_BYTES, UPLOAD_TEXT_FIELDS};

/// An uploaded archive plus the optional metadata fields sent with it.
#[derive(Debug)]
pub struct ArchiveUpload {
    pub data: Bytes,
    pub filename: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

fn multipart_error(e: MultipartError, max_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_size)
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", e))
    }
}

fn too_large(max_size: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "Archive exceeds maximum allowed size of {} MB",
        max_size / 1024 / 1024
    ))
}

/// Read a field chunk by chunk, failing as soon as it grows past `limit`.
async fn read_limited(
    mut field: Field<'_>,
    limit: usize,
    on_overflow: impl Fn() -> AppError,
    max_size: usize,
) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(on_overflow());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Extract the archive from a multipart form.
/// Exactly one field named "file" is accepted; `id`, `name` and `description`
/// are optional text fields and anything else is rejected.
pub async fn extract_archive_upload(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<ArchiveUpload, AppError> {
    let mut file: Option<(Bytes, String)> = None;
    let mut id = None;
    let mut name = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if file.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "upload".to_string());
            let data = read_limited(field, max_size, || too_large(max_size), max_size).await?;
            file = Some((data, filename));
        } else if UPLOAD_TEXT_FIELDS.contains(&field_name.as_str()) {
            let raw = read_limited(
                field,
                MAX_UPLOAD_TEXT_FIELD_BYTES,
                || AppError::InvalidInput(format!("Field '{}' is too long", field_name)),
                max_size,
            )
            .await?;
            let value = String::from_utf8(raw.to_vec()).map_err(|_| {
                AppError::InvalidInput(format!("Field '{}' must be UTF-8 text", field_name))
            })?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match field_name.as_str() {
                "id" => &mut id,
                "name" => &mut name,
                _ => &mut description,
            };
            *slot = Some(value.to_string());
        } else {
            return Err(AppError::InvalidInput(format!(
                "Unexpected multipart field '{}'",
                field_name
            )));
        }
    }

    let (data, filename) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(ArchiveUpload {
        data,
        filename,
        id,
        name,
        description,
    })
}
