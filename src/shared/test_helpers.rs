#[cfg(test)]
use crate::core::config::{
    AppConfig, Config, DatabaseConfig, StorageConfig, SwaggerConfig, VoicemailConfig,
};
#[cfg(test)]
use crate::features::voicemail::dtos::{AudioUpload, CreateVoicemailDto};
#[cfg(test)]
use crate::features::voicemail::{SqliteVoicemailRepository, VoicemailService};
#[cfg(test)]
use crate::modules::storage::LocalStorage;

#[cfg(test)]
use axum_test::TestServer;
#[cfg(test)]
use sqlx::SqlitePool;
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use tempfile::TempDir;

/// In-memory database with the schema applied
#[cfg(test)]
pub async fn migrated_pool() -> SqlitePool {
    let pool = crate::core::database::create_memory_pool()
        .await
        .expect("in-memory database");
    let no_migrations = std::path::Path::new("/nonexistent/voicemail-migrations");
    crate::core::migrations::run(&pool, no_migrations)
        .await
        .expect("baseline schema");
    pool
}

#[cfg(test)]
pub fn audio(file_name: Option<&str>) -> AudioUpload {
    AudioUpload {
        file_name: file_name.map(|s| s.to_string()),
        data: b"fake-webm-bytes".to_vec(),
    }
}

/// A complete submission for `owner_id` / `client_fingerprint`
#[cfg(test)]
pub fn submission(owner_id: &str, client_fingerprint: &str) -> CreateVoicemailDto {
    CreateVoicemailDto {
        audio: Some(audio(Some("a.webm"))),
        owner_id: Some(owner_id.to_string()),
        client_fingerprint: Some(client_fingerprint.to_string()),
        name: Some("Alice".to_string()),
        duration: Some("12.5".to_string()),
    }
}

/// Service, storage and config wired against an in-memory database and a temp dir
#[cfg(test)]
pub struct TestContext {
    pub config: Config,
    pub service: Arc<VoicemailService>,
    pub storage: Arc<LocalStorage>,
    _uploads: TempDir,
}

#[cfg(test)]
impl TestContext {
    pub async fn new(voicemail: VoicemailConfig) -> Self {
        let uploads = tempfile::tempdir().expect("temp uploads dir");

        let config = Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_allowed_origins: vec!["*".to_string()],
                public_api_url: None,
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
                migrations_dir: "/nonexistent/voicemail-migrations".into(),
                max_connections: 1,
                busy_timeout: std::time::Duration::from_secs(1),
            },
            storage: StorageConfig {
                uploads_dir: uploads.path().to_path_buf(),
                url_prefix: "/uploads".to_string(),
                max_upload_size: 1024 * 1024,
            },
            voicemail,
            swagger: SwaggerConfig {
                title: "Voicemail API".to_string(),
                version: "test".to_string(),
                description: "test".to_string(),
            },
        };

        let pool = migrated_pool().await;
        let storage = Arc::new(
            LocalStorage::new(&config.storage)
                .await
                .expect("local storage"),
        );
        let service = Arc::new(VoicemailService::new(
            Arc::new(SqliteVoicemailRepository::new(pool)),
            Arc::clone(&storage),
            config.voicemail.clone(),
        ));

        Self {
            config,
            service,
            storage,
            _uploads: uploads,
        }
    }

    /// Full application router behind an in-process test server
    pub fn server(&self) -> TestServer {
        let app = crate::core::app::build_router(
            &self.config,
            Arc::clone(&self.service),
            &self.storage,
        );
        TestServer::new(app).expect("test server")
    }

    /// Number of files currently in the uploads directory
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.storage.root())
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0)
    }
}
