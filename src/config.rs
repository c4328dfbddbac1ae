use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentBackend {
    Json,
    Redb,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Disk,
    Redb,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub data_path: String,
    pub uploads_path: String,
    pub public_path: String,
    pub templates_path: String,
    pub content_backend: ContentBackend,
    pub blob_backend: BlobBackend,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub require_login: bool,
    pub max_upload_size_mb: u64,
}

fn required(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!("FATAL: Environment variable '{}' is not set in your .env file.", name))
    })
}

fn absolute(name: &str, value: &str) -> Result<(), config::ConfigError> {
    if Path::new(value).is_relative() {
        return Err(config::ConfigError::Message(format!(
            "FATAL: The '{}' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
            name, value
        )));
    }
    Ok(())
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name).ok().and_then(|v| v.trim().parse::<bool>().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let data_path = required("DATA_PATH")?;
        let uploads_path = required("UPLOADS_PATH")?;
        absolute("DATA_PATH", &data_path)?;
        absolute("UPLOADS_PATH", &uploads_path)?;

        let session_secret_key = required("SESSION_SECRET_KEY")?;
        // 128 hex characters (64 bytes).
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
            ));
        }

        let content_backend = env::var("CONTENT_BACKEND").unwrap_or_else(|_| "json".to_string()).to_lowercase();
        if !["json", "redb"].contains(&content_backend.as_str()) {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'CONTENT_BACKEND' must be 'json' or 'redb', got '{}'.",
                content_backend
            )));
        }
        let blob_backend = env::var("BLOB_BACKEND").unwrap_or_else(|_| "disk".to_string()).to_lowercase();
        if !["disk", "redb"].contains(&blob_backend.as_str()) {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'BLOB_BACKEND' must be 'disk' or 'redb', got '{}'.",
                blob_backend
            )));
        }

        let max_upload_size_mb = match env::var("MAX_UPLOAD_SIZE_MB") {
            Ok(raw) => raw.trim().parse::<u64>().ok().filter(|mb| *mb > 0).ok_or_else(|| {
                config::ConfigError::Message("FATAL: 'MAX_UPLOAD_SIZE_MB' must be a positive whole number.".to_string())
            })?,
            Err(_) => 50,
        };

        let builder = config::Config::builder()
            // Base settings (web host/port) from the TOML file.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("data_path", data_path)?
            .set_override("uploads_path", uploads_path)?
            .set_override("public_path", env::var("PUBLIC_PATH").unwrap_or_else(|_| "./public".to_string()))?
            .set_override("templates_path", env::var("TEMPLATES_PATH").unwrap_or_else(|_| "templates".to_string()))?
            .set_override("content_backend", content_backend)?
            .set_override("blob_backend", blob_backend)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", env::var("ALLOWED_ORIGINS").unwrap_or_default())?
            .set_override("log_level", env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))?
            .set_override("use_secure_cookies", flag("USE_SECURE_COOKIES", false))?
            .set_override("require_login", flag("REQUIRE_LOGIN", true))?
            .set_override("max_upload_size_mb", max_upload_size_mb as i64)?
            .build()?;

        builder.try_deserialize()
    }

    /// Owner accounts database.
    pub fn owners_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("owners").join("owners.db")
    }

    /// The JSON content file used by the `json` content backend.
    pub fn content_json_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("content.json")
    }

    /// The redb file used by the `redb` content backend.
    pub fn content_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("content").join("content.redb")
    }

    /// The redb file used by the `redb` blob backend.
    pub fn blobs_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("blobs").join("blobs.redb")
    }
}
