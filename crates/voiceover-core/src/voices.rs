//! The voices offered to users.

use crate::error::{VoiceoverError, VoiceoverResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Voice used when nothing else is selected
pub const DEFAULT_VOICE_ID: &str = "Alex";

/// Gender classification for voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male voice
    Male,
    /// Female voice
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

/// A provider voice as presented to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Provider voice identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Voice gender
    pub gender: Gender,
    /// Short character description
    pub description: String,
}

impl Voice {
    /// Create a voice whose display name equals its id
    #[must_use]
    pub fn new(id: impl Into<String>, gender: Gender, description: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            gender,
            description: description.into(),
        }
    }
}

static OFFICIAL_VOICES: Lazy<Vec<Voice>> = Lazy::new(|| {
    vec![
        Voice::new("Alex", Gender::Male, "Energetic & Expressive"),
        Voice::new("Ashley", Gender::Female, "Warm & Natural"),
        Voice::new("Craig", Gender::Male, "Refined & Articulate"),
        Voice::new("Deborah", Gender::Female, "Gentle & Elegant"),
        Voice::new("Dennis", Gender::Male, "Smooth & Friendly"),
        Voice::new("Edward", Gender::Male, "Fast-talking & Emphatic"),
        Voice::new("Elizabeth", Gender::Female, "Professional & Polished"),
        Voice::new("Julia", Gender::Female, "Quirky & High-pitched"),
    ]
});

/// Ordered list of selectable voices
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Catalog of the official voices
    #[must_use]
    pub fn official() -> Self {
        Self {
            voices: OFFICIAL_VOICES.clone(),
        }
    }

    /// Catalog with custom voices, in the given order
    #[must_use]
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    /// All voices in display order
    #[must_use]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Look up a voice by id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no voice has this id
    pub fn get_voice(&self, voice_id: &str) -> VoiceoverResult<&Voice> {
        self.voices
            .iter()
            .find(|voice| voice.id == voice_id)
            .ok_or_else(|| VoiceoverError::invalid_input(format!("Voice not found: {voice_id}")))
    }

    /// Whether a voice with this id exists
    #[must_use]
    pub fn contains(&self, voice_id: &str) -> bool {
        self.voices.iter().any(|voice| voice.id == voice_id)
    }

    /// Voices of the given gender
    #[must_use]
    pub fn voices_by_gender(&self, gender: Gender) -> Vec<&Voice> {
        self.voices
            .iter()
            .filter(|voice| voice.gender == gender)
            .collect()
    }

    /// The default voice, or the first one if the default is missing
    #[must_use]
    pub fn default_voice(&self) -> Option<&Voice> {
        self.get_voice(DEFAULT_VOICE_ID)
            .ok()
            .or_else(|| self.voices.first())
    }

    /// Number of voices
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::official()
    }
}
