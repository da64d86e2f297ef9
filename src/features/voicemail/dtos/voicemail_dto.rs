use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::voicemail::models::Voicemail;

/// Upload voicemail request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadVoicemailDto {
    /// The recorded audio
    #[schema(format = Binary, content_media_type = "audio/webm")]
    pub audio: String,
    /// Submitter identity chosen by the client
    #[schema(example = "3f2a9c1e-6b4d-4e8f-9a21-7c5d0e1b2a3f")]
    pub owner_id: Option<String>,
    /// Per-device identifier used for rate limiting
    pub client_fingerprint: Option<String>,
    /// Display name
    #[schema(example = "Alice")]
    pub name: Option<String>,
    /// Length of the recording in seconds
    #[schema(example = 12.5)]
    pub duration: Option<f64>,
}

/// An uploaded audio blob as received from the client
#[derive(Debug, Clone)]
pub struct AudioUpload {
    /// Filename supplied with the multipart part, if any
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

/// Voicemail submission assembled from the multipart form
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateVoicemailDto {
    pub audio: Option<AudioUpload>,

    #[validate(length(max = 255, message = "owner_id is too long"))]
    pub owner_id: Option<String>,

    #[validate(length(max = 255, message = "client_fingerprint is too long"))]
    pub client_fingerprint: Option<String>,

    #[validate(length(max = 255, message = "name is too long"))]
    pub name: Option<String>,

    /// Raw `duration` form value; see [`parse_duration`]
    pub duration: Option<String>,
}

/// Response DTO for a voicemail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VoicemailResponseDto {
    pub id: i64,
    pub owner_id: Option<String>,
    pub client_fingerprint: Option<String>,
    pub name: Option<String>,
    /// Relative URL of the stored audio (e.g. "/uploads/1700000000000-a.webm")
    pub audio_url: String,
    /// Client-reported length in seconds
    pub duration: Option<f64>,
    /// Moderation flag; only allowed voicemails appear in the public list
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Voicemail> for VoicemailResponseDto {
    fn from(v: Voicemail) -> Self {
        Self {
            id: v.id,
            owner_id: v.owner_id,
            client_fingerprint: v.client_fingerprint,
            name: v.name,
            audio_url: v.audio_url,
            duration: v.duration,
            allowed: v.allowed,
            created_at: v.created_at,
            deleted_at: v.deleted_at,
        }
    }
}

/// Parse the `{allowed}` path segment of the moderation endpoint
pub fn parse_allowed_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "Invalid allowed value '{}', expected 0 or 1",
            other
        ))),
    }
}

/// Parse the `duration` form value as a finite, non-negative number of seconds
pub fn parse_duration(raw: Option<&str>) -> Result<Option<f64>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(Some(seconds)),
        Ok(_) => Err(AppError::Validation(format!(
            "duration must be a finite, non-negative number: {}",
            raw
        ))),
        Err(_) => Err(AppError::BadRequest(format!("Invalid duration: {}", raw))),
    }
}

/// Treat empty form values as absent
pub fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_flag() {
        assert!(parse_allowed_flag("1").unwrap());
        assert!(parse_allowed_flag("true").unwrap());
        assert!(!parse_allowed_flag("0").unwrap());
        assert!(!parse_allowed_flag("FALSE").unwrap());
        assert!(matches!(
            parse_allowed_flag("2"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  u1 ".to_string()), Some("u1".to_string()));
        assert_eq!(non_empty("   ".to_string()), None);
        assert_eq!(non_empty(String::new()), None);
    }

    #[test]
    fn test_validation_limits() {
        let ok = CreateVoicemailDto {
            name: Some("Alice".to_string()),
            duration: Some("3".to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let long_name = CreateVoicemailDto {
            name: Some("x".repeat(300)),
            ..Default::default()
        };
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(None).unwrap(), None);
        assert_eq!(parse_duration(Some("12.5")).unwrap(), Some(12.5));
        assert_eq!(parse_duration(Some("0")).unwrap(), Some(0.0));

        assert!(matches!(
            parse_duration(Some("long")),
            Err(AppError::BadRequest(_))
        ));
        for rejected in ["-1", "NaN", "nan", "inf", "-inf", "infinity"] {
            assert!(
                matches!(parse_duration(Some(rejected)), Err(AppError::Validation(_))),
                "{} should be rejected",
                rejected
            );
        }
    }
}
