use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::core::error::Result;
use crate::features::voicemail::models::{NewVoicemail, Voicemail};

const COLUMNS: &str = "id, owner_id, client_fingerprint, name, audio_url, duration, allowed, created_at, deleted_at";

/// Which live (non-deleted) voicemails a listing returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoicemailFilter {
    /// Every live voicemail (moderation view)
    All,
    /// Live and allowed voicemails (public view)
    Safe,
    /// Live voicemails of a single owner
    Owner {
        owner_id: String,
        require_allowed: bool,
    },
}

/// Persistence seam for voicemail rows
#[async_trait]
pub trait VoicemailRepository: Send + Sync {
    /// List live voicemails matching `filter`, oldest first
    async fn list(&self, filter: &VoicemailFilter) -> Result<Vec<Voicemail>>;

    /// Fetch a row by id whatever its status
    async fn find_by_id(&self, id: i64) -> Result<Option<Voicemail>>;

    /// Count live voicemails submitted by `owner_id` OR `client_fingerprint`
    async fn count_submissions(
        &self,
        owner_id: Option<&str>,
        client_fingerprint: Option<&str>,
    ) -> Result<i64>;

    /// Insert `new` only while the submitter has fewer than `limit` live voicemails.
    ///
    /// Returns `None` when the limit was already reached. The check and the
    /// insert run as one statement.
    async fn insert_within_limit(&self, new: &NewVoicemail, limit: i64)
        -> Result<Option<Voicemail>>;

    /// Mark a live voicemail deleted; returns false if none was updated
    async fn soft_delete(&self, id: i64) -> Result<bool>;

    /// Set the moderation flag of a live voicemail, returning the updated row
    async fn set_allowed(&self, id: i64, allowed: bool) -> Result<Option<Voicemail>>;
}

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteVoicemailRepository {
    pool: SqlitePool,
}

impl SqliteVoicemailRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoicemailRepository for SqliteVoicemailRepository {
    async fn list(&self, filter: &VoicemailFilter) -> Result<Vec<Voicemail>> {
        let rows = match filter {
            VoicemailFilter::All => {
                sqlx::query_as::<_, Voicemail>(&format!(
                    "SELECT {COLUMNS} FROM voicemail \
                     WHERE deleted_at IS NULL \
                     ORDER BY created_at ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            VoicemailFilter::Safe => {
                sqlx::query_as::<_, Voicemail>(&format!(
                    "SELECT {COLUMNS} FROM voicemail \
                     WHERE deleted_at IS NULL AND allowed = 1 \
                     ORDER BY created_at ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            VoicemailFilter::Owner {
                owner_id,
                require_allowed,
            } => {
                sqlx::query_as::<_, Voicemail>(&format!(
                    "SELECT {COLUMNS} FROM voicemail \
                     WHERE deleted_at IS NULL AND owner_id = ? AND (? = 0 OR allowed = 1) \
                     ORDER BY created_at ASC, id ASC"
                ))
                .bind(owner_id)
                .bind(*require_allowed)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Voicemail>> {
        let row = sqlx::query_as::<_, Voicemail>(&format!(
            "SELECT {COLUMNS} FROM voicemail WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_submissions(
        &self,
        owner_id: Option<&str>,
        client_fingerprint: Option<&str>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM voicemail
            WHERE deleted_at IS NULL
              AND (owner_id = ?1 OR client_fingerprint = ?2)
            "#,
        )
        .bind(owner_id)
        .bind(client_fingerprint)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert_within_limit(
        &self,
        new: &NewVoicemail,
        limit: i64,
    ) -> Result<Option<Voicemail>> {
        let row = sqlx::query_as::<_, Voicemail>(&format!(
            r#"
            INSERT INTO voicemail (owner_id, client_fingerprint, name, audio_url, duration, allowed)
            SELECT ?1, ?2, ?3, ?4, ?5, 1
            WHERE (
                SELECT COUNT(*) FROM voicemail
                WHERE deleted_at IS NULL
                  AND (owner_id = ?1 OR client_fingerprint = ?2)
            ) < ?6
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.owner_id)
        .bind(&new.client_fingerprint)
        .bind(&new.name)
        .bind(&new.audio_url)
        .bind(new.duration)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE voicemail
            SET deleted_at = CURRENT_TIMESTAMP
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_allowed(&self, id: i64, allowed: bool) -> Result<Option<Voicemail>> {
        let row = sqlx::query_as::<_, Voicemail>(&format!(
            "UPDATE voicemail SET allowed = ? \
             WHERE id = ? AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        ))
        .bind(allowed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
