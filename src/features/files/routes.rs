use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::dtos::UPLOAD_BODY_LIMIT;
use crate::features::files::handlers::{
    delete_file, delete_file_by_url, list_files, serve_upload, upload_files,
};
use crate::features::files::services::FileService;
use crate::modules::storage::DiskStore;

/// Routes that require a resolved API key
pub fn routes(file_service: Arc<FileService>) -> Router {
    Router::new()
        .route(
            "/api/upload",
            post(upload_files).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/files", get(list_files).delete(delete_file_by_url))
        .route("/api/files/{file_id}", delete(delete_file))
        .with_state(file_service)
}

/// Public static mount for uploaded blobs (no auth)
pub fn public_routes(store: Arc<DiskStore>) -> Router {
    Router::new()
        .route("/uploads/{name}", get(serve_upload))
        .with_state(store)
}
