use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for stored file metadata
#[derive(Debug, FromRow)]
pub struct File {
    pub id: Uuid,
    /// Stored filename, disambiguated at write time
    pub name: String,
    /// Public URL path the blob is served at (`/uploads/{name}`)
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub user_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
