use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub files_dir: PathBuf,
    pub max_file_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// 0 disables rate limiting.
    pub max_attempts_per_minute: u32,
    pub max_answer_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub submission: SubmissionConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.token_ttl_days", 7)?
            .set_default("storage.files_dir", "./data/files")?
            .set_default("storage.max_file_size", 64 * 1024 * 1024)?
            .set_default("submission.max_attempts_per_minute", 5)?
            .set_default("submission.max_answer_length", 1000)?
            .set_default("cache.capacity", 256)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FLAGSTAND__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("FLAGSTAND").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
