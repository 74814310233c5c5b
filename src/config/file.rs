//! TOML configuration file and persisted preferences
//!
//! `~/.config/kisan/config.toml` is a partial overlay on top of defaults.
//! The user's language preference is persisted separately under a fixed key
//! in `preferences.toml` in the data directory: read once at startup,
//! written on every language change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct KisanConfigFile {
    /// Reply language code (e.g. "hi-IN")
    #[serde(default)]
    pub language: Option<String>,

    /// Realtime session configuration
    #[serde(default)]
    pub session: SessionFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Mandi price API endpoints
    #[serde(default)]
    pub mandi: MandiFileConfig,
}

/// Realtime session configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Realtime model identifier
    pub model: Option<String>,

    /// Prebuilt voice name (e.g. "Orus")
    pub voice: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub generative: Option<String>,
    pub mandi: Option<String>,
}

/// Mandi endpoint overrides
#[derive(Debug, Default, Deserialize)]
pub struct MandiFileConfig {
    pub today_url: Option<String>,
    pub historical_url: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `KisanConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
#[must_use]
pub fn load_config_file() -> KisanConfigFile {
    let Some(path) = config_file_path() else {
        return KisanConfigFile::default();
    };

    if !path.exists() {
        return KisanConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                KisanConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            KisanConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/kisan/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("kisan").join("config.toml"))
}

/// Persisted user preferences
#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    /// The fixed language-preference key
    #[serde(default)]
    preferred_language: Option<String>,
}

fn preferences_path(data_dir: &Path) -> PathBuf {
    data_dir.join("preferences.toml")
}

/// Read the persisted language preference, if any
#[must_use]
pub fn load_language(data_dir: &Path) -> Option<String> {
    let path = preferences_path(data_dir);
    let content = std::fs::read_to_string(path).ok()?;
    let preferences: Preferences = toml::from_str(&content).ok()?;
    preferences.preferred_language.filter(|l| !l.is_empty())
}

/// Persist the language preference
///
/// # Errors
///
/// Returns an error if the preferences file cannot be serialized or written.
pub fn save_language(data_dir: &Path, language: &str) -> Result<()> {
    let preferences = Preferences {
        preferred_language: Some(language.to_string()),
    };
    let content = toml::to_string(&preferences)
        .map_err(|e| crate::Error::Config(format!("cannot serialize preferences: {e}")))?;
    std::fs::write(preferences_path(data_dir), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kisan-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn language_preference_roundtrip() {
        let dir = scratch_dir();

        assert_eq!(load_language(&dir), None);

        save_language(&dir, "ta-IN").unwrap();
        assert_eq!(load_language(&dir), Some("ta-IN".to_string()));

        // Overwritten on every change
        save_language(&dir, "mr-IN").unwrap();
        assert_eq!(load_language(&dir), Some("mr-IN".to_string()));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_preferences_file_is_none() {
        let dir = scratch_dir();
        assert_eq!(load_language(&dir), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
