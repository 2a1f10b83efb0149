use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs::File as TokioFile;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileByUrlDto, FileListResponseDto, FileRecordDto, UploadResponseDto, MAX_FILE_SIZE,
    MAX_MULTI_FILES, MAX_SINGLE_FILES,
};
use crate::features::files::services::FileService;
use crate::modules::storage::DiskStore;
use crate::shared::types::StatusMessage;

/// One file part pulled out of the multipart body
struct IncomingFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// Read the `file` and `files` multipart fields into memory, enforcing the
/// per-file size ceiling as each part is read. Unknown fields are ignored.
async fn collect_parts(mut multipart: Multipart) -> Result<Vec<IncomingFile>, AppError> {
    let mut singles: Vec<IncomingFile> = Vec::new();
    let mut multis: Vec<IncomingFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest("Failed to read multipart data".to_string())
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" | "files" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let content_type = field.content_type().map(|s| s.to_string()).unwrap_or_else(
                    || {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .essence_str()
                            .to_string()
                    },
                );

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest("Failed to read file data".to_string())
                })?;

                if data.len() > MAX_FILE_SIZE {
                    return Err(AppError::BadRequest(format!(
                        "File too large. Maximum size is {} bytes",
                        MAX_FILE_SIZE
                    )));
                }

                let part = IncomingFile {
                    filename,
                    content_type,
                    data,
                };

                if field_name == "file" {
                    singles.push(part);
                } else {
                    multis.push(part);
                }
            }
            _ => {
                // Ignore unknown fields
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    if singles.len() > MAX_SINGLE_FILES {
        return Err(AppError::BadRequest(format!(
            "Too many files in 'file' field. Maximum is {}",
            MAX_SINGLE_FILES
        )));
    }

    if multis.len() > MAX_MULTI_FILES {
        return Err(AppError::BadRequest(format!(
            "Too many files in 'files' field. Maximum is {}",
            MAX_MULTI_FILES
        )));
    }

    singles.append(&mut multis);

    if singles.is_empty() {
        return Err(AppError::BadRequest("No files were provided".to_string()));
    }

    Ok(singles)
}

/// Upload one or more files
///
/// Accepts multipart/form-data with a `file` field (at most one part) and a
/// `files` field (at most ten parts). Count and size ceilings reject the
/// whole request before any blob is written.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    request_body(
        content = crate::features::files::dtos::UploadFormDto,
        content_type = "multipart/form-data",
        description = "Multipart upload with `file` (max 1) and `files` (max 10) fields",
    ),
    responses(
        (status = 200, description = "Files uploaded successfully", body = UploadResponseDto),
        (status = 400, description = "No files, too many files, or a file over the size ceiling"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "API key does not grant write access")
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn upload_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    multipart: Multipart,
) -> Result<Json<UploadResponseDto>, AppError> {
    if !user.permission.allows_write() {
        return Err(AppError::Forbidden(
            "API key does not grant write access".to_string(),
        ));
    }

    let parts = collect_parts(multipart).await?;

    // Each file is written independently and concurrently; a failure fails
    // the request but files already persisted are not rolled back.
    let results = futures::future::join_all(parts.iter().map(|part| {
        service.upload_file(&part.data, &part.filename, &part.content_type, user.id)
    }))
    .await;

    let mut files: Vec<FileRecordDto> = Vec::with_capacity(results.len());
    for result in results {
        files.push(result?);
    }

    Ok(Json(UploadResponseDto {
        status: true,
        files,
        message: "Files uploaded successfully".to_string(),
    }))
}

/// List the authenticated user's files, newest first
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Files owned by the authenticated user", body = FileListResponseDto),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "API key does not grant read access")
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<FileListResponseDto>, AppError> {
    if !user.permission.allows_read() {
        return Err(AppError::Forbidden(
            "API key does not grant read access".to_string(),
        ));
    }

    let files = service.list_by_owner(user.id).await?;

    Ok(Json(FileListResponseDto {
        status: true,
        files,
    }))
}

/// Delete a file by id
///
/// Only the owner of the file can delete it. The backing blob is removed
/// best-effort; a blob already missing from disk does not block the delete.
#[utoipa::path(
    delete,
    path = "/api/files/{file_id}",
    tag = "files",
    params(
        ("file_id" = Uuid, Path, description = "Id of the file to delete")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = StatusMessage),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Not authorized to delete this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<StatusMessage>, AppError> {
    if !user.permission.allows_delete() {
        return Err(AppError::Forbidden(
            "API key does not grant delete access".to_string(),
        ));
    }

    service.delete_by_id(file_id, user.id).await?;

    Ok(Json(StatusMessage::ok("File deleted successfully")))
}

/// Delete a file by its public URL path
#[utoipa::path(
    delete,
    path = "/api/files",
    tag = "files",
    request_body = DeleteFileByUrlDto,
    responses(
        (status = 200, description = "File deleted successfully", body = StatusMessage),
        (status = 400, description = "Missing or empty url"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Not authorized to delete this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn delete_file_by_url(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<DeleteFileByUrlDto>,
) -> Result<Json<StatusMessage>, AppError> {
    if !user.permission.allows_delete() {
        return Err(AppError::Forbidden(
            "API key does not grant delete access".to_string(),
        ));
    }

    dto.validate()
        .map_err(|_| AppError::Validation("url is required".to_string()))?;

    service.delete_by_path(&dto.url, user.id).await?;

    Ok(Json(StatusMessage::ok("File deleted successfully")))
}

/// Serve an uploaded blob publicly.
///
/// No auth check: anyone holding the path can read the file. Unsafe names
/// are indistinguishable from missing ones.
pub async fn serve_upload(
    State(store): State<Arc<DiskStore>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let target = store
        .resolve(&name)
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let file = match TokioFile::open(&target).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata().await?;
    if metadata.is_dir() {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let mime = mime_guess::from_path(&name).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&metadata.len().to_string())
            .map_err(|_| AppError::Internal("Failed to build response headers".to_string()))?,
    );

    let stream = ReaderStream::new(file);

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}
