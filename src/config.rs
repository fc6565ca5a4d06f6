//! Configuration management for the talkback gateway

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Gateway configuration
///
/// Loaded from the environment; secrets never appear on the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (chat history, local artifacts)
    pub data_dir: PathBuf,

    /// Transcription service configuration
    pub transcription: TranscriptionConfig,

    /// Speech synthesis configuration
    pub synthesis: SynthesisConfig,

    /// Artifact storage configuration
    pub storage: StorageConfig,
}

/// Transcription service configuration
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Service base URL (override for tests or self-hosting)
    pub base_url: String,

    /// API key (from `ASSEMBLYAI_API_KEY` env)
    pub api_key: SecretString,

    /// Delay between consecutive job status checks
    pub poll_interval: Duration,

    /// Maximum status checks before the job is declared stuck
    pub poll_max_attempts: u32,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// TTS endpoint base URL
    pub base_url: String,

    /// Synthesis language (only "en" is recognized)
    pub language: String,
}

/// Artifact storage strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    /// Signed upload to remote object storage
    Cloudinary,
    /// Local file under a public-servable directory
    StaticDir,
    /// Inline data URI in the response payload
    Inline,
}

impl StorageStrategy {
    /// Parse a strategy name, defaulting to `Inline` for unknown values
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cloudinary" => Self::Cloudinary,
            "static" => Self::StaticDir,
            "inline" => Self::Inline,
            other => {
                tracing::warn!(strategy = %other, "unknown storage strategy, using inline");
                Self::Inline
            }
        }
    }
}

impl std::fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cloudinary => "cloudinary",
            Self::StaticDir => "static",
            Self::Inline => "inline",
        };
        f.write_str(name)
    }
}

/// Artifact storage configuration
///
/// Exactly one strategy is selected per deployment; credential fields are
/// validated when the publisher for that strategy is constructed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected strategy (from `TALKBACK_STORAGE` env)
    pub strategy: StorageStrategy,

    /// Object storage API base URL
    pub base_url: String,

    /// Object storage account identifier (from `CLOUDINARY_CLOUD_NAME` env)
    pub cloud_name: Option<String>,

    /// Object storage API key (from `CLOUDINARY_API_KEY` env)
    pub api_key: Option<String>,

    /// Object storage API secret (from `CLOUDINARY_API_SECRET` env)
    pub api_secret: Option<SecretString>,

    /// Public-servable root for the static strategy
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment
    #[must_use]
    pub fn load() -> Self {
        // Determine data directory (~/.local/share/omni/talkback on Linux)
        let data_dir = std::env::var("TALKBACK_DATA_DIR").map_or_else(
            |_| {
                directories::ProjectDirs::from("dev", "omni", "omni")
                    .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("talkback"))
            },
            PathBuf::from,
        );

        // Ensure data dir exists
        std::fs::create_dir_all(&data_dir).ok();

        let transcription = TranscriptionConfig {
            base_url: std::env::var("TALKBACK_STT_URL")
                .unwrap_or_else(|_| "https://api.assemblyai.com".to_string()),
            api_key: SecretString::from(
                std::env::var("ASSEMBLYAI_API_KEY").unwrap_or_default(),
            ),
            poll_interval: Duration::from_millis(
                std::env::var("TALKBACK_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            poll_max_attempts: std::env::var("TALKBACK_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        };

        let synthesis = SynthesisConfig {
            base_url: std::env::var("TALKBACK_TTS_URL")
                .unwrap_or_else(|_| "https://translate.google.com/translate_tts".to_string()),
            language: std::env::var("TALKBACK_TTS_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
        };

        let strategy = std::env::var("TALKBACK_STORAGE")
            .map(|s| StorageStrategy::from_str(&s))
            .unwrap_or(StorageStrategy::Inline);

        // The static strategy always has a root; other strategies carry none
        let static_dir = (strategy == StorageStrategy::StaticDir).then(|| {
            std::env::var("TALKBACK_STATIC_DIR")
                .map_or_else(|_| data_dir.join("audio"), PathBuf::from)
        });

        let storage = StorageConfig {
            strategy,
            base_url: std::env::var("TALKBACK_STORAGE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").ok(),
            api_key: std::env::var("CLOUDINARY_API_KEY").ok(),
            api_secret: std::env::var("CLOUDINARY_API_SECRET")
                .ok()
                .map(SecretString::from),
            static_dir,
        };

        Self {
            data_dir,
            transcription,
            synthesis,
            storage,
        }
    }

    /// Path of the persisted chat history file
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("chat_history.json")
    }
}
