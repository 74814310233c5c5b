//! Configuration for the Kisan gateway

pub mod file;

use std::path::PathBuf;

use crate::{Error, Result};

/// Default realtime session model
pub const DEFAULT_LIVE_MODEL: &str = "gemini-live-2.5-flash-preview";

/// Default prebuilt voice for audio replies
pub const DEFAULT_VOICE: &str = "Orus";

/// Default reply language
pub const DEFAULT_LANGUAGE: &str = "hi-IN";

/// Default current-day mandi price endpoint
pub const DEFAULT_TODAY_MANDI_URL: &str =
    "https://api.data.gov.in/resource/9ef84268-d588-465a-a308-a864a43d0070";

/// Default historical mandi price endpoint
pub const DEFAULT_HISTORICAL_MANDI_URL: &str =
    "https://api.data.gov.in/resource/35985678-0d79-46b4-9ed6-6f13308a1d24";

/// Kisan gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (preferences, caches)
    pub data_dir: PathBuf,

    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Mandi price API endpoints
    pub mandi: MandiEndpoints,

    /// Realtime session configuration
    pub session: SessionConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Generative AI key (realtime session, summaries, vision)
    pub generative: Option<String>,

    /// Mandi price API key
    pub mandi: Option<String>,
}

/// Mandi price API endpoints
#[derive(Debug, Clone)]
pub struct MandiEndpoints {
    /// Current-day price API base URL
    pub today_url: String,

    /// Historical price API base URL
    pub historical_url: String,
}

impl Default for MandiEndpoints {
    fn default() -> Self {
        Self {
            today_url: DEFAULT_TODAY_MANDI_URL.to_string(),
            historical_url: DEFAULT_HISTORICAL_MANDI_URL.to_string(),
        }
    }
}

/// Realtime session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Realtime model identifier
    pub model: String,

    /// Prebuilt voice name
    pub voice: String,

    /// Reply language code; persisted across runs
    pub language: String,
}

impl Config {
    /// Load configuration from the config file, environment, and persisted
    /// preferences
    ///
    /// Language precedence: explicit override, then the persisted
    /// preference, then the config file, then the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no data directory can be resolved, or an
    /// IO error if it cannot be created.
    pub fn load(language_override: Option<&str>) -> Result<Self> {
        let config_file = file::load_config_file();

        let data_dir = directories::ProjectDirs::from("dev", "kisanmitra", "kisan")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::Config("could not resolve a data directory".to_string()))?;
        std::fs::create_dir_all(&data_dir)?;

        let language = language_override
            .map(str::to_string)
            .or_else(|| file::load_language(&data_dir))
            .or(config_file.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let api_keys = ApiKeys {
            generative: env_var("KISAN_GENERATIVE_API_KEY").or(config_file.api_keys.generative),
            mandi: env_var("KISAN_MANDI_API_KEY").or(config_file.api_keys.mandi),
        };

        let mandi = MandiEndpoints {
            today_url: env_var("KISAN_TODAY_MANDI_URL")
                .or(config_file.mandi.today_url)
                .unwrap_or_else(|| DEFAULT_TODAY_MANDI_URL.to_string()),
            historical_url: env_var("KISAN_HISTORICAL_MANDI_URL")
                .or(config_file.mandi.historical_url)
                .unwrap_or_else(|| DEFAULT_HISTORICAL_MANDI_URL.to_string()),
        };

        let session = SessionConfig {
            model: config_file
                .session
                .model
                .unwrap_or_else(|| DEFAULT_LIVE_MODEL.to_string()),
            voice: config_file
                .session
                .voice
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            language,
        };

        Ok(Self {
            data_dir,
            api_keys,
            mandi,
            session,
        })
    }

    /// Change the reply language and persist the preference
    ///
    /// # Errors
    ///
    /// Returns an error if the preference file cannot be written.
    pub fn set_language(&mut self, language: impl Into<String>) -> Result<()> {
        let language = language.into();
        file::save_language(&self.data_dir, &language)?;
        self.session.language = language;
        Ok(())
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
