// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

/// Which AI backend serves generation requests.
///
/// Selected via the `AI_PROVIDER` environment variable and injected into
/// the application state at startup, so the active provider is ordinary
/// configuration rather than process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "openrouter" => Some(ProviderKind::OpenRouter),
            "gemini" => Some(ProviderKind::Gemini),
            _ => None,
        }
    }
}

/// AI backend settings.
///
/// A missing API key does not prevent startup; it renders the capability
/// non-functional (every generation call fails with a clear error).
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub ai: AiConfig,
    /// Root directory for uploaded document blobs.
    pub storage_root: PathBuf,
    /// Directory for the local artifact cache.
    pub cache_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let provider = env::var("AI_PROVIDER")
            .ok()
            .and_then(|v| ProviderKind::parse(&v))
            .unwrap_or(ProviderKind::OpenRouter);

        let api_key = match provider {
            ProviderKind::OpenRouter => env::var("OPENROUTER_API_KEY").ok(),
            ProviderKind::Gemini => env::var("GEMINI_API_KEY").ok(),
        };

        let ai = AiConfig {
            provider,
            api_key,
            model: env::var("AI_MODEL").ok(),
        };

        let storage_root = env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdf-cache"));

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20 * 1024 * 1024);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            ai,
            storage_root,
            cache_dir,
            max_upload_bytes,
        }
    }
}
