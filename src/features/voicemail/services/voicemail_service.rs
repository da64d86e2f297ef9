use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::core::config::VoicemailConfig;
use crate::core::error::{AppError, Result};
use crate::features::voicemail::dtos::{parse_duration, AudioUpload, CreateVoicemailDto};
use crate::features::voicemail::models::{NewVoicemail, Voicemail};
use crate::features::voicemail::repositories::{VoicemailFilter, VoicemailRepository};
use crate::modules::storage::LocalStorage;
use crate::shared::constants::{
    FALLBACK_AUDIO_EXTENSION, MSG_AUDIO_REQUIRED, MSG_IDENTITY_REQUIRED, MSG_TOO_MANY_REQUESTS,
    MSG_VOICEMAIL_NOT_FOUND,
};

/// Attempts at finding an unused upload filename
const SAVE_ATTEMPTS: u32 = 5;

/// Longest client filename kept in a stored name, leaving room for the
/// timestamp prefix under the usual 255-byte filesystem limit
const MAX_ORIGINAL_NAME_BYTES: usize = 200;

/// Extensions longer than this are treated as part of the name when truncating
const MAX_EXTENSION_BYTES: usize = 16;

/// Build the stored filename for an upload.
///
/// `<timestamp_ms>-<original>` when the client sent a usable filename,
/// otherwise `<timestamp_ms>-<NNNN>.webm` with a zero-padded suffix.
pub fn stored_filename(timestamp_ms: i64, original: Option<&str>, fallback_suffix: u16) -> String {
    match original.and_then(sanitize_file_name) {
        Some(name) => format!("{}-{}", timestamp_ms, name),
        None => format!(
            "{}-{:04}.{}",
            timestamp_ms,
            fallback_suffix % 10_000,
            FALLBACK_AUDIO_EXTENSION
        ),
    }
}

/// Keep only the final path component of a client-supplied filename,
/// shortened to [`MAX_ORIGINAL_NAME_BYTES`] with its extension preserved
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => return None,
        _ if name.len() <= MAX_ORIGINAL_NAME_BYTES => return Some(name.to_string()),
        _ => {}
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXTENSION_BYTES => {
            (stem, Some(ext))
        }
        _ => (name, None),
    };

    let budget = MAX_ORIGINAL_NAME_BYTES - extension.map_or(0, |ext| ext.len() + 1);
    let mut end = budget.min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    Some(match extension {
        Some(ext) => format!("{}.{}", &stem[..end], ext),
        None => stem[..end].to_string(),
    })
}

/// Service for voicemail upload, listing and moderation
pub struct VoicemailService {
    repository: Arc<dyn VoicemailRepository>,
    storage: Arc<LocalStorage>,
    config: VoicemailConfig,
}

impl VoicemailService {
    pub fn new(
        repository: Arc<dyn VoicemailRepository>,
        storage: Arc<LocalStorage>,
        config: VoicemailConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            config,
        }
    }

    /// All live voicemails, including disallowed ones
    pub async fn list_all(&self) -> Result<Vec<Voicemail>> {
        self.repository.list(&VoicemailFilter::All).await
    }

    /// Live voicemails that passed moderation
    pub async fn list_safe(&self) -> Result<Vec<Voicemail>> {
        self.repository.list(&VoicemailFilter::Safe).await
    }

    /// Live voicemails submitted by `owner_id`
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Voicemail>> {
        self.repository
            .list(&VoicemailFilter::Owner {
                owner_id: owner_id.to_string(),
                require_allowed: self.config.owner_list_requires_allowed,
            })
            .await
    }

    /// Store the audio and record a new voicemail.
    ///
    /// Checks run in order: audio present, submitter identity, field limits,
    /// upload limit. Nothing is written to disk until all of them pass.
    pub async fn upload(&self, mut dto: CreateVoicemailDto) -> Result<Voicemail> {
        let audio = dto
            .audio
            .take()
            .ok_or_else(|| AppError::BadRequest(MSG_AUDIO_REQUIRED.to_string()))?;

        let has_identity = dto.owner_id.is_some() || dto.client_fingerprint.is_some();
        if self.config.require_identity
            && (dto.owner_id.is_none() || dto.client_fingerprint.is_none())
        {
            debug!(
                "Rejected upload without identity: owner_id={:?}, client_fingerprint={:?}",
                dto.owner_id, dto.client_fingerprint
            );
            return Err(AppError::Forbidden(MSG_IDENTITY_REQUIRED.to_string()));
        }

        dto.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let duration = parse_duration(dto.duration.as_deref())?;

        // Anonymous uploads (identity not required) are not rate limited
        let limit = if has_identity {
            self.config.upload_limit
        } else {
            i64::MAX
        };

        if has_identity {
            let count = self
                .repository
                .count_submissions(dto.owner_id.as_deref(), dto.client_fingerprint.as_deref())
                .await?;
            if count >= limit {
                debug!(
                    "Upload limit reached: owner_id={:?}, client_fingerprint={:?}, count={}, limit={}",
                    dto.owner_id, dto.client_fingerprint, count, limit
                );
                return Err(AppError::RateLimitExceeded(MSG_TOO_MANY_REQUESTS.to_string()));
            }
        }

        let (filename, audio_url) = self.store_audio(&audio).await?;

        let new = NewVoicemail {
            owner_id: dto.owner_id,
            client_fingerprint: dto.client_fingerprint,
            name: dto.name,
            audio_url,
            duration,
        };

        let inserted = match self.repository.insert_within_limit(&new, limit).await {
            Ok(inserted) => inserted,
            Err(e) => {
                self.discard(&filename).await;
                return Err(e);
            }
        };

        match inserted {
            Some(voicemail) => {
                info!(
                    "Voicemail stored: id={}, owner_id={:?}, audio_url={}, size={}",
                    voicemail.id,
                    voicemail.owner_id,
                    voicemail.audio_url,
                    audio.data.len()
                );
                Ok(voicemail)
            }
            None => {
                // A concurrent upload from the same submitter took the last slot
                warn!(
                    "Upload limit reached during insert: owner_id={:?}, client_fingerprint={:?}",
                    new.owner_id, new.client_fingerprint
                );
                self.discard(&filename).await;
                Err(AppError::RateLimitExceeded(MSG_TOO_MANY_REQUESTS.to_string()))
            }
        }
    }

    /// Soft delete a voicemail, returning it as it was before deletion
    pub async fn delete(&self, id: i64) -> Result<Voicemail> {
        let voicemail = self.find_mutable(id).await?;

        if !self.repository.soft_delete(id).await? {
            // Deleted by a concurrent request in between
            return Err(AppError::NotFound(MSG_VOICEMAIL_NOT_FOUND.to_string()));
        }

        info!(
            "Voicemail soft deleted: id={}, audio_url={}",
            voicemail.id, voicemail.audio_url
        );
        Ok(voicemail)
    }

    /// Set the moderation flag, returning the updated voicemail
    pub async fn set_allowed(&self, id: i64, allowed: bool) -> Result<Voicemail> {
        let before = self.find_mutable(id).await?;

        let updated = self
            .repository
            .set_allowed(id, allowed)
            .await?
            .ok_or_else(|| AppError::NotFound(MSG_VOICEMAIL_NOT_FOUND.to_string()))?;

        info!(
            "Voicemail moderated: id={}, status {} -> {}",
            id,
            before.status(),
            updated.status()
        );
        Ok(updated)
    }

    /// Look up a voicemail that moderation may still act on
    async fn find_mutable(&self, id: i64) -> Result<Voicemail> {
        match self.repository.find_by_id(id).await? {
            Some(voicemail) if voicemail.status().is_mutable() => Ok(voicemail),
            Some(_) => {
                debug!("Voicemail {} is already deleted", id);
                Err(AppError::NotFound(MSG_VOICEMAIL_NOT_FOUND.to_string()))
            }
            None => Err(AppError::NotFound(MSG_VOICEMAIL_NOT_FOUND.to_string())),
        }
    }

    /// Write the audio under a fresh filename, retrying on a same-millisecond collision
    async fn store_audio(&self, audio: &AudioUpload) -> Result<(String, String)> {
        let mut attempt = 1;
        loop {
            let filename = self.filename_for(audio);
            match self.storage.save(&filename, &audio.data).await {
                Ok(url) => return Ok((filename, url)),
                Err(AppError::Io(e))
                    if e.kind() == io::ErrorKind::AlreadyExists && attempt < SAVE_ATTEMPTS =>
                {
                    debug!("Upload name {} already taken, retrying", filename);
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn filename_for(&self, audio: &AudioUpload) -> String {
        let suffix = rand::thread_rng().gen_range(0..=9999u16);
        stored_filename(
            Utc::now().timestamp_millis(),
            audio.file_name.as_deref(),
            suffix,
        )
    }

    async fn discard(&self, filename: &str) {
        if let Err(e) = self.storage.remove(filename).await {
            warn!("Failed to remove orphaned upload {}: {}", filename, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::voicemail::models::VoicemailStatus;
    use crate::shared::test_helpers::{audio, submission, TestContext};

    #[test]
    fn test_stored_filename_uses_original_name() {
        assert_eq!(
            stored_filename(1_700_000_000_000, Some("x.webm"), 42),
            "1700000000000-x.webm"
        );
    }

    #[test]
    fn test_stored_filename_fallback_is_zero_padded() {
        assert_eq!(stored_filename(5, None, 7), "5-0007.webm");
        assert_eq!(stored_filename(5, Some(""), 9999), "5-9999.webm");
        assert_eq!(stored_filename(5, Some("  "), 123), "5-0123.webm");
    }

    #[test]
    fn test_stored_filename_strips_directories() {
        assert_eq!(stored_filename(1, Some("../../etc/passwd"), 0), "1-passwd");
        assert_eq!(stored_filename(1, Some("C:\\tmp\\a.webm"), 0), "1-a.webm");
        assert_eq!(stored_filename(1, Some("dir/.."), 3), "1-0003.webm");
    }

    #[test]
    fn test_stored_filename_shortens_long_names() {
        let long = format!("{}.webm", "a".repeat(300));
        let stored = stored_filename(1_700_000_000_000, Some(&long), 0);
        assert!(stored.len() <= "1700000000000-".len() + MAX_ORIGINAL_NAME_BYTES);
        assert!(stored.ends_with("aaa.webm"));

        // Multi-byte characters are never split
        let wide = "é".repeat(150);
        let stored = stored_filename(1, Some(&wide), 0);
        assert!(stored.len() <= "1-".len() + MAX_ORIGINAL_NAME_BYTES);
        assert!(stored.trim_start_matches("1-").chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn test_upload_requires_audio() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let mut dto = submission("u1", "f1");
        dto.audio = None;

        let err = ctx.service.upload(dto).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(ref m) if m == MSG_AUDIO_REQUIRED));
        assert!(ctx.service.list_all().await.unwrap().is_empty());
        assert_eq!(ctx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_upload_requires_identity() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let mut dto = submission("u1", "f1");
        dto.client_fingerprint = None;

        let err = ctx.service.upload(dto).await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(ctx.service.list_all().await.unwrap().is_empty());
        assert_eq!(ctx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_identity_is_checked_before_duration() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let mut dto = submission("u1", "f1");
        dto.owner_id = None;
        dto.duration = Some("long".to_string());

        let err = ctx.service.upload(dto).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_non_finite_duration_is_rejected() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;

        for raw in ["NaN", "inf", "-1"] {
            let mut dto = submission("u1", "f1");
            dto.duration = Some(raw.to_string());

            let err = ctx.service.upload(dto).await.unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
        assert_eq!(ctx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_long_filename_is_stored() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let mut dto = submission("u1", "f1");
        dto.audio = Some(audio(Some(&format!("{}.webm", "v".repeat(300)))));

        let created = ctx.service.upload(dto).await.unwrap();

        assert!(created.audio_url.ends_with(".webm"));
        assert_eq!(ctx.stored_files(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_upload_when_identity_optional() {
        let config = VoicemailConfig {
            require_identity: false,
            upload_limit: 0,
            ..Default::default()
        };
        let ctx = TestContext::new(config).await;
        let mut dto = submission("u1", "f1");
        dto.owner_id = None;
        dto.client_fingerprint = None;

        let created = ctx.service.upload(dto).await.unwrap();
        assert!(created.owner_id.is_none());
        assert_eq!(ctx.stored_files(), 1);
    }

    #[tokio::test]
    async fn test_upload_persists_file_then_record() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;

        let created = ctx.service.upload(submission("u1", "f1")).await.unwrap();

        assert!(created.allowed);
        assert_eq!(created.status(), VoicemailStatus::Active);
        assert!(created.audio_url.starts_with("/uploads/"));
        assert!(created.audio_url.ends_with("-a.webm"));

        let filename = created.audio_url.trim_start_matches("/uploads/");
        assert!(ctx.storage.exists(filename).await);
    }

    #[tokio::test]
    async fn test_upload_limit_by_owner_or_fingerprint() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;

        ctx.service.upload(submission("u1", "f1")).await.unwrap();
        ctx.service.upload(submission("u2", "f1")).await.unwrap();

        // New owner, but the fingerprint already has two live voicemails
        let err = ctx.service.upload(submission("u3", "f1")).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimitExceeded(_)));
        assert_eq!(ctx.stored_files(), 2);

        // u1 has one voicemail and a fresh fingerprint: still below the limit
        ctx.service.upload(submission("u1", "f9")).await.unwrap();

        // Now u1 has two via the owner id alone
        let err = ctx.service.upload(submission("u1", "f8")).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimitExceeded(_)));
        assert_eq!(ctx.stored_files(), 3);
    }

    #[tokio::test]
    async fn test_deleting_frees_a_slot() {
        let ctx = TestContext::new(VoicemailConfig {
            upload_limit: 1,
            ..Default::default()
        })
        .await;

        let first = ctx.service.upload(submission("u1", "f1")).await.unwrap();
        assert!(ctx.service.upload(submission("u1", "f1")).await.is_err());

        ctx.service.delete(first.id).await.unwrap();
        assert!(ctx.service.upload(submission("u1", "f1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_returns_snapshot_and_hides_everywhere() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let created = ctx.service.upload(submission("u1", "f1")).await.unwrap();

        let snapshot = ctx.service.delete(created.id).await.unwrap();
        assert_eq!(snapshot, created);
        assert!(snapshot.deleted_at.is_none());

        assert!(ctx.service.list_all().await.unwrap().is_empty());
        assert!(ctx.service.list_safe().await.unwrap().is_empty());
        assert!(ctx.service.list_for_owner("u1").await.unwrap().is_empty());

        // Second delete finds the row but refuses it
        let err = ctx.service.delete(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = ctx.service.set_allowed(created.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_disallow_hides_from_safe_list_only() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let created = ctx.service.upload(submission("u1", "f1")).await.unwrap();

        let updated = ctx.service.set_allowed(created.id, false).await.unwrap();
        assert!(!updated.allowed);
        assert_eq!(updated.status(), VoicemailStatus::Disallowed);

        assert!(ctx.service.list_safe().await.unwrap().is_empty());
        assert_eq!(ctx.service.list_all().await.unwrap().len(), 1);
        assert_eq!(ctx.service.list_for_owner("u1").await.unwrap().len(), 1);

        let restored = ctx.service.set_allowed(created.id, true).await.unwrap();
        assert!(restored.allowed);
        assert_eq!(ctx.service.list_safe().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_owner_list_policy_can_require_allowed() {
        let ctx = TestContext::new(VoicemailConfig {
            owner_list_requires_allowed: true,
            ..Default::default()
        })
        .await;
        let created = ctx.service.upload(submission("u1", "f1")).await.unwrap();
        ctx.service.set_allowed(created.id, false).await.unwrap();

        assert!(ctx.service.list_for_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;

        assert!(matches!(
            ctx.service.delete(404).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ctx.service.set_allowed(404, true).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_without_filename_uses_fallback() {
        let ctx = TestContext::new(VoicemailConfig::default()).await;
        let mut dto = submission("u1", "f1");
        dto.audio = Some(audio(None));

        let created = ctx.service.upload(dto).await.unwrap();
        let filename = created.audio_url.trim_start_matches("/uploads/");
        let (_, suffix) = filename.split_once('-').unwrap();

        assert_eq!(suffix.len(), "0000.webm".len());
        assert!(suffix.ends_with(".webm"));
        assert!(suffix[..4].chars().all(|c| c.is_ascii_digit()));
    }
}
