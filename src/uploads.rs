//! Bootcamp photo intake: multipart reading, checks and storage.

use crate::utils::{ApiError, ApiResult};
use axum::extract::Multipart;
use bytes::BytesMut;
use mongodb::bson::oid::ObjectId;
use std::path::{Path, PathBuf};

/// Multipart field carrying the photo
pub const PHOTO_FIELD: &str = "file";

/// A photo read fully into memory, within the size ceiling
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: bytes::Bytes,
}

impl PhotoUpload {
    /// Extension to store the photo under, with the leading dot
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .and_then(clean_extension)
            .or_else(|| {
                // No usable file name; fall back to the media subtype
                self.content_type
                    .split_once('/')
                    .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
                    .and_then(clean_extension)
            })
            .unwrap_or_default()
    }
}

/// `.ext` for a short ASCII-alphanumeric extension, anything else is dropped
fn clean_extension(raw: &str) -> Option<String> {
    (!raw.is_empty() && raw.len() <= 10 && raw.bytes().all(|b| b.is_ascii_alphanumeric()))
        .then(|| format!(".{}", raw.to_ascii_lowercase()))
}

pub fn ensure_image(content_type: Option<&str>) -> ApiResult<()> {
    match content_type {
        Some(kind) if kind.starts_with("image") => Ok(()),
        _ => Err(ApiError::upload_error("Please upload an image file")),
    }
}

pub fn too_large(max_file_size: u64) -> ApiError {
    ApiError::upload_error(format!(
        "Please upload an image less than {} bytes",
        max_file_size
    ))
}

/// Stored name for a bootcamp photo
pub fn photo_file_name(bootcamp_id: &ObjectId, extension: &str) -> String {
    format!("photo_{}{}", bootcamp_id.to_hex(), extension)
}

/// Read the `file` field, stopping as soon as it outgrows `max_file_size`
pub async fn read_photo(multipart: &mut Multipart, max_file_size: u64) -> ApiResult<PhotoUpload> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        ensure_image(field.content_type())?;
        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            if (data.len() + chunk.len()) as u64 > max_file_size {
                return Err(too_large(max_file_size));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            break;
        }

        return Ok(PhotoUpload {
            file_name,
            content_type,
            data: data.freeze(),
        });
    }

    Err(ApiError::upload_error("Please upload a file"))
}

/// Write the photo under `upload_dir`, creating the directory when needed
pub async fn store_photo(upload_dir: &Path, file_name: &str, data: &[u8]) -> ApiResult<PathBuf> {
    let path = upload_dir.join(file_name);

    let result = async {
        tokio::fs::create_dir_all(upload_dir).await?;
        tokio::fs::write(&path, data).await
    }
    .await;

    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), bytes = data.len(), "Photo stored");
            Ok(path)
        }
        Err(err) => {
            tracing::error!(path = %path.display(), "Photo write failed: {}", err);
            Err(ApiError::internal_error("Problem with file upload"))
        }
    }
}
