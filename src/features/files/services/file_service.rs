use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::FileRecordDto;
use crate::features::files::models::File;
use crate::modules::storage::DiskStore;

/// Service for file metadata operations, backed by the disk blob store
pub struct FileService {
    pool: PgPool,
    store: Arc<DiskStore>,
}

impl FileService {
    pub fn new(pool: PgPool, store: Arc<DiskStore>) -> Self {
        Self { pool, store }
    }

    /// Write one uploaded file to the blob store and record its metadata.
    ///
    /// The metadata row is only created after every byte of the blob is on
    /// disk, so no row ever references a partial file.
    pub async fn upload_file(
        &self,
        data: &[u8],
        original_filename: &str,
        content_type: &str,
        user_id: Uuid,
    ) -> Result<FileRecordDto> {
        let blob = self.store.write(original_filename, data).await?;
        let path = format!("/uploads/{}", blob.name);

        let file = sqlx::query_as::<_, File>(
            r#"
            INSERT INTO files (name, path, size, mime_type, user_id, is_public)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(&blob.name)
        .bind(&path)
        .bind(blob.size)
        .bind(content_type)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "File stored: id={}, name={}, size={}, user_id={}",
            file.id, file.name, file.size, file.user_id
        );

        Ok(file.into())
    }

    /// All files owned by `user_id`, newest first.
    pub async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<FileRecordDto>> {
        let files = sqlx::query_as::<_, File>(
            r#"
            SELECT * FROM files
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files.into_iter().map(FileRecordDto::from).collect())
    }

    /// Delete a file by id. Only the owner may delete.
    pub async fn delete_by_id(&self, file_id: Uuid, user_id: Uuid) -> Result<()> {
        let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;

        let file = file.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        self.delete_located(file, user_id).await
    }

    /// Delete a file located by its public URL path.
    pub async fn delete_by_path(&self, path: &str, user_id: Uuid) -> Result<()> {
        let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        let file = file.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        self.delete_located(file, user_id).await
    }

    /// Shared tail of both delete variants: ownership check, best-effort
    /// blob removal, then the metadata delete. A blob already missing from
    /// disk never blocks the row delete.
    async fn delete_located(&self, file: File, user_id: Uuid) -> Result<()> {
        if file.user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this file".to_string(),
            ));
        }

        self.store.remove(&file.name).await?;

        debug!("Blob removal attempted: {}", file.name);

        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file.id)
            .execute(&self.pool)
            .await?;

        info!("File deleted: id={}, name={}", file.id, file.name);

        Ok(())
    }
}
