use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, put},
    Router,
};
use std::sync::Arc;

use crate::features::voicemail::handlers::{
    delete_voicemail, list_my_voicemails, list_safe_voicemails, list_voicemails,
    update_voicemail_allowed, upload_voicemail,
};
use crate::features::voicemail::services::VoicemailService;

/// Create routes for the voicemail feature
pub fn routes(voicemail_service: Arc<VoicemailService>, max_upload_size: usize) -> Router {
    Router::new()
        .route(
            "/api/voicemail",
            get(list_voicemails).post(upload_voicemail),
        )
        .route("/api/voicemail/safe", get(list_safe_voicemails))
        .route("/api/voicemail/my/{owner_id}", get(list_my_voicemails))
        .route("/api/voicemail/{id}", delete(delete_voicemail))
        .route(
            "/api/voicemail/{id}/allow/{allowed}",
            put(update_voicemail_allowed).patch(update_voicemail_allowed),
        )
        // Allow body size up to max_upload_size + buffer for multipart overhead
        .layer(DefaultBodyLimit::max(max_upload_size + 1024 * 1024))
        .with_state(voicemail_service)
}
