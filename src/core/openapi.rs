use utoipa::openapi::ServerBuilder;
use utoipa::{Modify, OpenApi};

use crate::features::diagnostics::{dtos as diagnostics_dtos, handlers as diagnostics_handlers};
use crate::features::voicemail::{dtos as voicemail_dtos, handlers as voicemail_handlers};
use crate::shared::types::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Voicemail
        voicemail_handlers::upload_voicemail,
        voicemail_handlers::list_voicemails,
        voicemail_handlers::list_safe_voicemails,
        voicemail_handlers::list_my_voicemails,
        voicemail_handlers::delete_voicemail,
        voicemail_handlers::update_voicemail_allowed,
        // Diagnostics
        diagnostics_handlers::get_caller_info,
    ),
    components(
        schemas(
            ErrorResponse,
            voicemail_dtos::UploadVoicemailDto,
            voicemail_dtos::VoicemailResponseDto,
            diagnostics_dtos::CallerInfoDto,
            diagnostics_dtos::RemoteAddressDto,
        )
    ),
    tags(
        (name = "voicemail", description = "Voicemail upload, listing and moderation"),
        (name = "diagnostics", description = "Connection diagnostics"),
    ),
    info(
        title = "Voicemail API",
        version = "0.1.0",
        description = "Voicemail upload, playback and moderation API",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
    /// Public base URL of the API, advertised as the server entry
    pub server_url: Option<String>,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());

        if let Some(url) = &self.server_url {
            openapi.servers = Some(vec![ServerBuilder::new().url(url.clone()).build()]);
        }
    }
}
