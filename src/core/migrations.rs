//! Startup schema bootstrapper
//!
//! Applies the built-in baseline schema, then every `*.sql` file found in the
//! configured migrations directory that has not been recorded yet. Applied
//! versions are tracked in `schema_migrations`; a failing file is rolled back,
//! logged and retried on the next start without aborting startup.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Version recorded for the built-in schema
pub const BASELINE_VERSION: &str = "0000_baseline";

const CREATE_TRACKING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY NOT NULL,
    applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const CREATE_VOICEMAIL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS voicemail (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id TEXT,
    client_fingerprint TEXT,
    name TEXT,
    audio_url TEXT NOT NULL,
    duration REAL,
    allowed BOOLEAN NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted_at DATETIME
)
"#;

/// Columns that older databases may lack, with the statement that adds each one
const EVOLVED_COLUMNS: &[(&str, &str)] = &[
    (
        "allowed",
        "ALTER TABLE voicemail ADD COLUMN allowed BOOLEAN NOT NULL DEFAULT 1",
    ),
    (
        "client_fingerprint",
        "ALTER TABLE voicemail ADD COLUMN client_fingerprint TEXT",
    ),
    ("duration", "ALTER TABLE voicemail ADD COLUMN duration REAL"),
    (
        "deleted_at",
        "ALTER TABLE voicemail ADD COLUMN deleted_at DATETIME",
    ),
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_voicemail_owner_id ON voicemail (owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_voicemail_client_fingerprint ON voicemail (client_fingerprint)",
];

/// Outcome of a bootstrap run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied during this run
    pub applied: Vec<String>,
    /// Versions already recorded by an earlier run
    pub skipped: Vec<String>,
    /// Versions that failed and were rolled back
    pub failed: Vec<String>,
}

/// Bring the schema up to date.
///
/// Errors from the baseline are returned (the store is unusable without it);
/// errors from directory migrations are logged and reported in `failed`.
pub async fn run(pool: &SqlitePool, migrations_dir: &Path) -> Result<MigrationReport, sqlx::Error> {
    let mut report = MigrationReport::default();

    sqlx::query(CREATE_TRACKING_TABLE).execute(pool).await?;

    let baseline_recorded = is_recorded(pool, BASELINE_VERSION).await?;
    apply_baseline(pool).await?;
    if baseline_recorded {
        report.skipped.push(BASELINE_VERSION.to_string());
    } else {
        record(pool, BASELINE_VERSION).await?;
        report.applied.push(BASELINE_VERSION.to_string());
        info!("Applied baseline schema {}", BASELINE_VERSION);
    }

    for path in discover(migrations_dir).await {
        let Some(version) = version_of(&path) else {
            continue;
        };

        if is_recorded(pool, &version).await? {
            debug!("Migration {} already applied", version);
            report.skipped.push(version);
            continue;
        }

        match apply_file(pool, &path, &version).await {
            Ok(()) => {
                info!("Applied migration {}", version);
                report.applied.push(version);
            }
            Err(e) => {
                warn!(
                    "Migration {} failed to execute, skipping: {}",
                    path.display(),
                    e
                );
                report.failed.push(version);
            }
        }
    }

    Ok(report)
}

/// Create the voicemail table and add any column an older schema is missing
async fn apply_baseline(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_VOICEMAIL_TABLE).execute(pool).await?;

    let existing: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('voicemail')")
        .fetch_all(pool)
        .await?;

    for (column, ddl) in EVOLVED_COLUMNS {
        if !existing.iter().any(|c| c == column) {
            info!("Adding missing column voicemail.{}", column);
            sqlx::query(ddl).execute(pool).await?;
        }
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

async fn apply_file(pool: &SqlitePool, path: &Path, version: &str) -> Result<(), sqlx::Error> {
    let sql = tokio::fs::read_to_string(path).await?;

    let mut tx = pool.begin().await?;
    let applied = async {
        sqlx::raw_sql(&sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        Ok::<_, sqlx::Error>(())
    }
    .await;

    match applied {
        Ok(()) => tx.commit().await,
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}

async fn is_recorded(pool: &SqlitePool, version: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations WHERE version = ?")
        .bind(version)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn record(pool: &SqlitePool, version: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// List `*.sql` files in `dir`, sorted by file name
async fn discover(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No migrations read from {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                let is_sql = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
                if is_sql && path.is_file() {
                    files.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", dir.display(), e);
                break;
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

fn version_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
}
