use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::File;

/// Maximum size of a single uploaded file (1 GiB)
pub const MAX_FILE_SIZE: usize = 1024 * 1024 * 1024;

/// At most one file in the `file` multipart field
pub const MAX_SINGLE_FILES: usize = 1;

/// At most ten files in the `files` multipart field
pub const MAX_MULTI_FILES: usize = 10;

/// Request body ceiling for uploads. Headroom above the per-file ceiling so
/// a slightly oversized file is rejected by the size check with a
/// descriptive message instead of by the transport.
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 64 * 1024 * 1024;

/// One stored file as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecordDto {
    pub id: Uuid,
    /// Stored filename (disambiguated from the original on collision)
    pub name: String,
    /// Public path the blob is served at
    pub path: String,
    /// Size in bytes
    pub size: i64,
    pub mime_type: String,
    /// Owning user
    pub user_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<File> for FileRecordDto {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            name: file.name,
            path: file.path,
            size: file.size,
            mime_type: file.mime_type,
            user_id: file.user_id,
            is_public: file.is_public,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// Upload request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFormDto {
    /// Single file field (at most one part)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: Option<String>,
    /// Repeatable field carrying up to ten parts
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Option<String>,
}

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponseDto {
    pub status: bool,
    pub files: Vec<FileRecordDto>,
    pub message: String,
}

/// Response for listing the authenticated owner's files
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListResponseDto {
    pub status: bool,
    pub files: Vec<FileRecordDto>,
}

/// Request DTO for deleting a file by its public URL path
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteFileByUrlDto {
    /// The `/uploads/...` path of the file to delete
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_serializes_camel_case() {
        let record = FileRecordDto {
            id: Uuid::nil(),
            name: "report.pdf".to_string(),
            path: "/uploads/report.pdf".to_string(),
            size: 512_000,
            mime_type: "application/pdf".to_string(),
            user_id: Uuid::nil(),
            is_public: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["mimeType"], "application/pdf");
        assert_eq!(value["userId"], Uuid::nil().to_string());
        assert_eq!(value["isPublic"], true);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("mime_type").is_none());
    }

    #[test]
    fn test_delete_by_url_requires_url() {
        let dto = DeleteFileByUrlDto {
            url: String::new(),
        };
        assert!(dto.validate().is_err());

        let dto = DeleteFileByUrlDto {
            url: "/uploads/report.pdf".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
