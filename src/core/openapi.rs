use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth::model::{ApiKeyPermission, AuthenticatedUser};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::StatusMessage;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::upload_files,
        files_handlers::list_files,
        files_handlers::delete_file,
        files_handlers::delete_file_by_url,
    ),
    components(
        schemas(
            // Shared
            StatusMessage,
            // Auth
            AuthenticatedUser,
            ApiKeyPermission,
            // Files
            files_dtos::UploadFormDto,
            files_dtos::FileRecordDto,
            files_dtos::UploadResponseDto,
            files_dtos::FileListResponseDto,
            files_dtos::DeleteFileByUrlDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "File upload, listing and deletion")
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
