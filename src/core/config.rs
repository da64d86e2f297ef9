use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub voicemail: VoicemailConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Base URL the frontend uses to reach this API (advertised in the OpenAPI servers list)
    pub public_api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: PathBuf,
    /// Directory scanned for additional `.sql` migrations
    pub migrations_dir: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

/// Local filesystem storage for uploaded audio
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory the audio blobs are written to
    pub uploads_dir: PathBuf,
    /// Public URL prefix the blobs are served under (e.g. "/uploads")
    pub url_prefix: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_size: usize,
}

#[derive(Debug, Clone)]
pub struct VoicemailConfig {
    /// Maximum number of live voicemails per owner or fingerprint
    pub upload_limit: i64,
    /// Reject uploads that carry no owner_id or client_fingerprint
    pub require_identity: bool,
    /// Hide disallowed voicemails from the owner's own listing
    pub owner_list_requires_allowed: bool,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Read an environment variable and parse it, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid value, got '{}'", key, raw)),
        _ => Ok(default),
    }
}

/// Parse boolean flags leniently ("1", "true", "yes", "on")
fn env_flag(key: &str, default: bool) -> Result<bool, String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("{} must be a boolean, got '{}'", key, raw)),
        },
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            voicemail: VoicemailConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_PORT: u16 = 9888;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_or("SERVER_PORT", Self::DEFAULT_PORT)?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let public_api_url = env::var("PUBLIC_API_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            public_api_url,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_PATH: &'static str = "database/database.sqlite";
    const DEFAULT_MIGRATIONS_DIR: &'static str = "database/simple-migrations";
    const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

    pub fn from_env() -> Result<Self, String> {
        let path = env::var("DATABASE_PATH").unwrap_or_else(|_| Self::DEFAULT_PATH.to_string());
        let migrations_dir = env::var("MIGRATIONS_DIR")
            .unwrap_or_else(|_| Self::DEFAULT_MIGRATIONS_DIR.to_string());
        let max_connections = env_or("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?;
        let busy_timeout_secs = env_or("DB_BUSY_TIMEOUT_SECS", Self::DEFAULT_BUSY_TIMEOUT_SECS)?;

        if max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be at least 1".to_string());
        }

        Ok(Self {
            path: PathBuf::from(path),
            migrations_dir: PathBuf::from(migrations_dir),
            max_connections,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
        })
    }
}

impl StorageConfig {
    const DEFAULT_UPLOADS_DIR: &'static str = "public/uploads";
    const DEFAULT_URL_PREFIX: &'static str = "/uploads";
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let uploads_dir =
            env::var("UPLOADS_DIR").unwrap_or_else(|_| Self::DEFAULT_UPLOADS_DIR.to_string());
        let url_prefix = env::var("UPLOADS_URL_PREFIX")
            .unwrap_or_else(|_| Self::DEFAULT_URL_PREFIX.to_string());
        let max_upload_size = env_or("MAX_UPLOAD_SIZE", Self::DEFAULT_MAX_UPLOAD_SIZE)?;

        Ok(Self {
            uploads_dir: PathBuf::from(uploads_dir),
            url_prefix: normalize_url_prefix(&url_prefix),
            max_upload_size,
        })
    }
}

/// Ensure the prefix starts with a single '/' and has no trailing '/'
fn normalize_url_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        StorageConfig::DEFAULT_URL_PREFIX.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl VoicemailConfig {
    const DEFAULT_UPLOAD_LIMIT: i64 = 2;

    pub fn from_env() -> Result<Self, String> {
        let upload_limit = env_or("UPLOAD_LIMIT", Self::DEFAULT_UPLOAD_LIMIT)?;
        if upload_limit < 0 {
            return Err("UPLOAD_LIMIT must not be negative".to_string());
        }

        Ok(Self {
            upload_limit,
            require_identity: env_flag("VOICEMAIL_REQUIRE_IDENTITY", true)?,
            owner_list_requires_allowed: env_flag("VOICEMAIL_OWNER_LIST_REQUIRES_ALLOWED", false)?,
        })
    }
}

impl Default for VoicemailConfig {
    fn default() -> Self {
        Self {
            upload_limit: Self::DEFAULT_UPLOAD_LIMIT,
            require_identity: true,
            owner_list_requires_allowed: false,
        }
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Voicemail API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Voicemail upload, playback and moderation API".to_string());

        Ok(Self {
            title,
            version,
            description,
        })
    }
}
