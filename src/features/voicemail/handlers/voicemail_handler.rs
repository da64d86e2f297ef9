use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppPath;
use crate::features::voicemail::dtos::{
    non_empty, parse_allowed_flag, AudioUpload, CreateVoicemailDto, UploadVoicemailDto,
    VoicemailResponseDto,
};
use crate::features::voicemail::models::Voicemail;
use crate::features::voicemail::services::VoicemailService;
use crate::shared::constants::FIELD_AUDIO;
use crate::shared::types::ErrorResponse;

/// Map a multipart read failure, keeping 413 for bodies over the upload limit
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    debug!("{}: {}", context, e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, e.body_text()))
    } else {
        AppError::BadRequest(format!("{}: {}", context, e.body_text()))
    }
}

fn to_response(voicemails: Vec<Voicemail>) -> Vec<VoicemailResponseDto> {
    voicemails.into_iter().map(VoicemailResponseDto::from).collect()
}

/// Upload a voicemail
///
/// Accepts multipart/form-data with:
/// - `audio`: The recorded audio (required)
/// - `owner_id`, `client_fingerprint`: Submitter identity (required unless disabled)
/// - `name`: Display name (optional)
/// - `duration`: Length in seconds (optional)
#[utoipa::path(
    post,
    path = "/api/voicemail",
    tag = "voicemail",
    request_body(
        content = UploadVoicemailDto,
        content_type = "multipart/form-data",
        description = "Audio recording with submitter identity and metadata",
    ),
    responses(
        (status = 200, description = "Voicemail stored", body = VoicemailResponseDto),
        (status = 400, description = "Missing audio or invalid field", body = ErrorResponse),
        (status = 403, description = "Missing owner_id or client_fingerprint", body = ErrorResponse),
        (status = 413, description = "Upload larger than MAX_UPLOAD_SIZE", body = ErrorResponse),
        (status = 429, description = "Upload limit reached", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse)
    )
)]
pub async fn upload_voicemail(
    State(service): State<Arc<VoicemailService>>,
    mut multipart: Multipart,
) -> Result<Json<VoicemailResponseDto>> {
    let mut dto = CreateVoicemailDto::default();

    // Process multipart fields
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart data", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            FIELD_AUDIO => {
                let file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read audio data", e))?;

                dto.audio = Some(AudioUpload {
                    file_name,
                    data: data.to_vec(),
                });
            }
            "owner_id" | "client_fingerprint" | "name" | "duration" => {
                let text = field.text().await.map_err(|e| {
                    multipart_error(&format!("Failed to read {} field", field_name), e)
                })?;
                let value = non_empty(text);

                match field_name.as_str() {
                    "owner_id" => dto.owner_id = value,
                    "client_fingerprint" => dto.client_fingerprint = value,
                    "name" => dto.name = value,
                    _ => dto.duration = value,
                }
            }
            _ => {
                // Ignore unknown fields
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let voicemail = service.upload(dto).await?;

    Ok(Json(voicemail.into()))
}

/// List all live voicemails (moderation view)
#[utoipa::path(
    get,
    path = "/api/voicemail",
    tag = "voicemail",
    responses(
        (status = 200, description = "Live voicemails, oldest first", body = Vec<VoicemailResponseDto>)
    )
)]
pub async fn list_voicemails(
    State(service): State<Arc<VoicemailService>>,
) -> Result<Json<Vec<VoicemailResponseDto>>> {
    let voicemails = service.list_all().await?;
    Ok(Json(to_response(voicemails)))
}

/// List voicemails that passed moderation
#[utoipa::path(
    get,
    path = "/api/voicemail/safe",
    tag = "voicemail",
    responses(
        (status = 200, description = "Allowed live voicemails, oldest first", body = Vec<VoicemailResponseDto>)
    )
)]
pub async fn list_safe_voicemails(
    State(service): State<Arc<VoicemailService>>,
) -> Result<Json<Vec<VoicemailResponseDto>>> {
    let voicemails = service.list_safe().await?;
    Ok(Json(to_response(voicemails)))
}

/// List the voicemails of one submitter
#[utoipa::path(
    get,
    path = "/api/voicemail/my/{owner_id}",
    tag = "voicemail",
    params(
        ("owner_id" = String, Path, description = "Submitter identity")
    ),
    responses(
        (status = 200, description = "The owner's live voicemails, oldest first", body = Vec<VoicemailResponseDto>)
    )
)]
pub async fn list_my_voicemails(
    State(service): State<Arc<VoicemailService>>,
    AppPath(owner_id): AppPath<String>,
) -> Result<Json<Vec<VoicemailResponseDto>>> {
    let voicemails = service.list_for_owner(&owner_id).await?;
    Ok(Json(to_response(voicemails)))
}

/// Soft delete a voicemail
///
/// Returns the voicemail as it was before deletion.
#[utoipa::path(
    delete,
    path = "/api/voicemail/{id}",
    tag = "voicemail",
    params(
        ("id" = i64, Path, description = "Voicemail ID")
    ),
    responses(
        (status = 200, description = "Voicemail deleted", body = VoicemailResponseDto),
        (status = 400, description = "Invalid ID", body = ErrorResponse),
        (status = 404, description = "Voicemail not found", body = ErrorResponse)
    )
)]
pub async fn delete_voicemail(
    State(service): State<Arc<VoicemailService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<VoicemailResponseDto>> {
    let voicemail = service.delete(id).await?;
    Ok(Json(voicemail.into()))
}

/// Allow or disallow a voicemail in the public list
#[utoipa::path(
    put,
    path = "/api/voicemail/{id}/allow/{allowed}",
    tag = "voicemail",
    params(
        ("id" = i64, Path, description = "Voicemail ID"),
        ("allowed" = String, Path, description = "1 to allow, 0 to disallow")
    ),
    responses(
        (status = 200, description = "Updated voicemail", body = VoicemailResponseDto),
        (status = 400, description = "Invalid ID or flag", body = ErrorResponse),
        (status = 404, description = "Voicemail not found", body = ErrorResponse)
    )
)]
pub async fn update_voicemail_allowed(
    State(service): State<Arc<VoicemailService>>,
    AppPath((id, allowed)): AppPath<(i64, String)>,
) -> Result<Json<VoicemailResponseDto>> {
    let allowed = parse_allowed_flag(&allowed)?;
    let voicemail = service.set_allowed(id, allowed).await?;
    Ok(Json(voicemail.into()))
}
