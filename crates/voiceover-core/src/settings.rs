//! Persisted voice selection.

use crate::error::{VoiceoverError, VoiceoverResult};
use crate::storage::KeyValueStore;
use crate::synthesis::{SynthesisOptions, DEFAULT_PITCH, DEFAULT_SPEAKING_RATE};
use crate::voices::DEFAULT_VOICE_ID;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Storage key holding the serialized settings
pub const SETTINGS_STORAGE_KEY: &str = "app_settings";

/// Voice, rate and pitch chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Selected voice id
    pub voice_id: String,
    /// Speaking rate multiplier
    pub speech_rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            speech_rate: DEFAULT_SPEAKING_RATE,
            pitch: DEFAULT_PITCH,
        }
    }
}

fn check_positive(name: &str, value: f32) -> VoiceoverResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VoiceoverError::invalid_input(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

impl VoiceSettings {
    /// Select a voice
    ///
    /// # Errors
    ///
    /// Returns an error if `voice_id` is empty
    pub fn set_voice_id(&mut self, voice_id: impl Into<String>) -> VoiceoverResult<()> {
        let voice_id = voice_id.into();
        if voice_id.is_empty() {
            return Err(VoiceoverError::invalid_input("Voice ID cannot be empty"));
        }
        self.voice_id = voice_id;
        Ok(())
    }

    /// Set the speaking rate
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is not a finite positive number
    pub fn set_speech_rate(&mut self, rate: f32) -> VoiceoverResult<()> {
        check_positive("Speech rate", rate)?;
        self.speech_rate = rate;
        Ok(())
    }

    /// Set the pitch
    ///
    /// # Errors
    ///
    /// Returns an error if `pitch` is not a finite positive number
    pub fn set_pitch(&mut self, pitch: f32) -> VoiceoverResult<()> {
        check_positive("Pitch", pitch)?;
        self.pitch = pitch;
        Ok(())
    }

    /// Prosody options for a synthesis call
    #[must_use]
    pub const fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            pitch: Some(self.pitch),
            speed: Some(self.speech_rate),
        }
    }

    /// Settings from a stored document; invalid or missing fields keep
    /// their defaults.
    #[allow(clippy::cast_possible_truncation)]
    fn from_stored(value: &Value) -> Self {
        let mut settings = Self::default();

        if let Some(voice_id) = value.get("voiceId").and_then(Value::as_str) {
            if !voice_id.is_empty() {
                settings.voice_id = voice_id.to_string();
            }
        }

        let positive = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .map(|v| v as f32)
                .filter(|v| v.is_finite() && *v > 0.0)
        };
        if let Some(rate) = positive("speechRate") {
            settings.speech_rate = rate;
        }
        if let Some(pitch) = positive("pitch") {
            settings.pitch = pitch;
        }

        settings
    }
}

/// [`VoiceSettings`] persistence over a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    /// Settings stored under [`SETTINGS_STORAGE_KEY`]
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or defaults when absent or unreadable
    pub async fn load(&self) -> VoiceSettings {
        let raw = match self.store.get(SETTINGS_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return VoiceSettings::default(),
            Err(e) => {
                warn!("Failed to load settings: {}", e);
                return VoiceSettings::default();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => VoiceSettings::from_stored(&value),
            Err(e) => {
                warn!("Ignoring unreadable settings: {}", e);
                VoiceSettings::default()
            }
        }
    }

    /// Persist `settings`; failures are logged
    pub async fn save(&self, settings: &VoiceSettings) {
        let raw = match serde_json::to_string(settings) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize settings: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(SETTINGS_STORAGE_KEY, &raw).await {
            warn!("Failed to save settings: {}", e);
        }
    }
}
