use axum::{routing::get, Router};

use crate::features::diagnostics::handlers::get_caller_info;

/// Create routes for the diagnostics feature
pub fn routes() -> Router {
    Router::new().route("/api/me", get(get_caller_info))
}
