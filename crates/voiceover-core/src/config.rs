//! Configuration for the Voiceover core.
//!
//! Values come from compiled defaults, optionally a TOML file, and finally
//! `VOICEOVER_*` environment variables, in that order of precedence.

use crate::chunker::ChunkBounds;
use crate::error::{VoiceoverError, VoiceoverResult};
use crate::provider::AudioEncoding;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Speech provider connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the TTS API; requests go to `{base_url}/voice`
    pub base_url: String,
    /// Provider model identifier sent with every request
    pub model_id: String,
    /// API key half of the Basic credential
    pub api_key: String,
    /// API secret half of the Basic credential
    pub api_secret: String,
    /// Audio encoding requested from the provider
    pub audio_encoding: AudioEncoding,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Transport-level retries per chunk
    pub max_retries: u32,
    /// Linear backoff step between retries, in milliseconds
    pub retry_backoff_ms: u64,
    /// In-flight request ceiling
    pub max_concurrent_requests: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.inworld.ai/tts/v1".to_string(),
            model_id: "inworld-tts-1".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            audio_encoding: AudioEncoding::Mp3,
            request_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_concurrent_requests: 1,
        }
    }
}

impl ProviderConfig {
    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backoff step between retries
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Account (identity) service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// REST endpoint, e.g. `https://cloud.appwrite.io/v1`
    pub endpoint: String,
    /// Project identifier sent as `X-Appwrite-Project`
    pub project_id: String,
    /// Platform identifier registered with the project
    pub platform: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            project_id: String::new(),
            platform: "app.voiceover.studio".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl AccountConfig {
    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Credits granted once on the first verified session
    pub welcome_credits: u64,
    /// Redirect URI the OAuth flow returns to
    pub oauth_redirect_uri: String,
    /// Reachability probe target as `host:port`; derived from the account endpoint when unset
    pub probe_target: Option<String>,
    /// Reachability probe timeout in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            welcome_credits: 2000,
            oauth_redirect_uri: "voiceover://login-callback".to_string(),
            probe_target: None,
            probe_timeout_ms: 3000,
        }
    }
}

impl SessionConfig {
    /// Reachability probe timeout
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted keys; the platform data directory when unset
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the storage directory
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the platform data
    /// directory cannot be determined
    pub fn resolve_data_dir(&self) -> VoiceoverResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let proj_dirs = ProjectDirs::from("app", "Voiceover", "voiceover").ok_or_else(|| {
            VoiceoverError::configuration("Failed to determine project directories")
        })?;
        let dir = proj_dirs.data_dir().join("storage");
        info!("Using platform storage directory: {:?}", dir);
        Ok(dir)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceoverConfig {
    /// Speech provider settings
    pub provider: ProviderConfig,
    /// Chunk size window
    pub chunking: ChunkBounds,
    /// Account service settings
    pub account: AccountConfig,
    /// Session reconciliation settings
    pub session: SessionConfig,
    /// Local storage settings
    pub storage: StorageConfig,
}

impl VoiceoverConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed
    pub fn from_toml_str(content: &str) -> VoiceoverResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file, apply environment overrides and validate
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or the result
    /// fails validation
    pub fn from_file(path: &Path) -> VoiceoverResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VoiceoverError::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Defaults plus environment overrides, validated
    ///
    /// # Errors
    ///
    /// Returns an error if the result fails validation
    pub fn from_env() -> VoiceoverResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `VOICEOVER_*` variables looked up through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 6] = [
            ("VOICEOVER_TTS_API_KEY", &mut self.provider.api_key),
            ("VOICEOVER_TTS_API_SECRET", &mut self.provider.api_secret),
            ("VOICEOVER_TTS_BASE_URL", &mut self.provider.base_url),
            ("VOICEOVER_TTS_MODEL", &mut self.provider.model_id),
            ("VOICEOVER_ACCOUNT_ENDPOINT", &mut self.account.endpoint),
            ("VOICEOVER_ACCOUNT_PROJECT", &mut self.account.project_id),
        ];

        for (key, field) in targets {
            if let Some(value) = lookup(key) {
                debug!("Config override from {}", key);
                *field = value;
            }
        }

        if let Some(dir) = lookup("VOICEOVER_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> VoiceoverResult<()> {
        self.chunking
            .validate()
            .map_err(|e| VoiceoverError::configuration(e.to_string()))?;

        if self.provider.base_url.is_empty() {
            return Err(VoiceoverError::configuration("Provider base URL cannot be empty"));
        }

        if self.provider.model_id.is_empty() {
            return Err(VoiceoverError::configuration("Provider model ID cannot be empty"));
        }

        if self.provider.max_concurrent_requests != 1 {
            return Err(VoiceoverError::configuration(format!(
                "Only one in-flight synthesis request is supported, got {}",
                self.provider.max_concurrent_requests
            )));
        }

        if self.provider.request_timeout_secs == 0 || self.account.request_timeout_secs == 0 {
            return Err(VoiceoverError::configuration("Request timeouts must be greater than 0"));
        }

        if self.account.endpoint.is_empty() {
            return Err(VoiceoverError::configuration("Account endpoint cannot be empty"));
        }

        if self.session.oauth_redirect_uri.is_empty() {
            return Err(VoiceoverError::configuration("OAuth redirect URI cannot be empty"));
        }

        Ok(())
    }
}
