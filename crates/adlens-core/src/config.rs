//! Configuration module
//!
//! Environment-driven configuration for the API server and CLI,
//! covering provider credentials, blob storage, upload limits, and
//! activation-poll tuning.

use std::env;

// Defaults
const SERVER_PORT: u16 = 3000;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 300;
const FILE_POLL_MAX_ATTEMPTS: u32 = 30;
const FILE_POLL_INITIAL_DELAY_MS: u64 = 1000;
const FILE_POLL_MAX_DELAY_MS: u64 = 10_000;
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const ALLOWED_CONTENT_TYPES: &str =
    "video/mp4,video/quicktime,video/x-msvideo,image/jpeg,image/png,image/webp";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Media-understanding provider credentials and model.
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Copy-generation provider; enrichment is skipped when unset.
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    /// Secret for signing client upload tokens; the blob handshake
    /// refuses at request time when unset.
    pub blob_signing_key: Option<String>,
    pub blob_storage_path: String,
    /// External base URL used to build blob and callback URLs.
    pub public_base_url: String,
    pub max_upload_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// Coarse ceiling applied to the whole analyze request.
    pub request_timeout_seconds: u64,
    pub file_poll_max_attempts: u32,
    pub file_poll_initial_delay_ms: u64,
    pub file_poll_max_delay_ms: u64,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| ALLOWED_CONTENT_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            server_port,
            cors_origins,
            environment,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("GOOGLE_API_KEY"))
                .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY must be set"))?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_MODEL.to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| ANTHROPIC_MODEL.to_string()),
            blob_signing_key: env::var("BLOB_SIGNING_KEY")
                .or_else(|_| env::var("BLOB_READ_WRITE_TOKEN"))
                .ok()
                .filter(|s| !s.is_empty()),
            blob_storage_path: env::var("BLOB_STORAGE_PATH")
                .unwrap_or_else(|_| "data/blobs".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{server_port}")),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_content_types,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            file_poll_max_attempts: env::var("FILE_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| FILE_POLL_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(FILE_POLL_MAX_ATTEMPTS),
            file_poll_initial_delay_ms: env::var("FILE_POLL_INITIAL_DELAY_MS")
                .unwrap_or_else(|_| FILE_POLL_INITIAL_DELAY_MS.to_string())
                .parse()
                .unwrap_or(FILE_POLL_INITIAL_DELAY_MS),
            file_poll_max_delay_ms: env::var("FILE_POLL_MAX_DELAY_MS")
                .unwrap_or_else(|_| FILE_POLL_MAX_DELAY_MS.to_string())
                .parse()
                .unwrap_or(FILE_POLL_MAX_DELAY_MS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY must not be empty"));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be at least 1"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must list at least one MIME type"
            ));
        }
        if let Some(bad) = self
            .allowed_content_types
            .iter()
            .find(|ct| !ct.contains('/'))
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES entry '{bad}' is not a MIME type"
            ));
        }

        if self.file_poll_max_attempts == 0 {
            return Err(anyhow::anyhow!("FILE_POLL_MAX_ATTEMPTS must be at least 1"));
        }
        if self.file_poll_initial_delay_ms > self.file_poll_max_delay_ms {
            return Err(anyhow::anyhow!(
                "FILE_POLL_INITIAL_DELAY_MS must not exceed FILE_POLL_MAX_DELAY_MS"
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECONDS must be at least 1"));
        }

        Ok(())
    }
}
