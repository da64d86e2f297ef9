use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Lifecycle state derived from the `allowed` and `deleted_at` columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoicemailStatus {
    /// Visible to everyone
    Active,
    /// Hidden from the public list by a moderator
    Disallowed,
    /// Soft-deleted; excluded from every listing
    Deleted,
}

impl VoicemailStatus {
    /// Whether moderation endpoints may still act on the voicemail
    pub fn is_mutable(self) -> bool {
        !matches!(self, VoicemailStatus::Deleted)
    }
}

impl std::fmt::Display for VoicemailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoicemailStatus::Active => write!(f, "active"),
            VoicemailStatus::Disallowed => write!(f, "disallowed"),
            VoicemailStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Database model for voicemail
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Voicemail {
    pub id: i64,
    pub owner_id: Option<String>,
    pub client_fingerprint: Option<String>,
    pub name: Option<String>,
    pub audio_url: String,
    pub duration: Option<f64>,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Voicemail {
    pub fn status(&self) -> VoicemailStatus {
        if self.deleted_at.is_some() {
            VoicemailStatus::Deleted
        } else if !self.allowed {
            VoicemailStatus::Disallowed
        } else {
            VoicemailStatus::Active
        }
    }
}

/// Input for creating a voicemail row; the store assigns id and timestamps
#[derive(Debug, Clone, Default)]
pub struct NewVoicemail {
    pub owner_id: Option<String>,
    pub client_fingerprint: Option<String>,
    pub name: Option<String>,
    pub audio_url: String,
    pub duration: Option<f64>,
}
