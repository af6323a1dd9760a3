//! # Voiceover Core
//!
//! Engine behind the Voiceover authoring app.
//!
//! ## Features
//!
//! - Script chunking into provider-sized pieces at natural break points
//! - Sequential, retrying synthesis through the Inworld TTS API with audio
//!   reassembled in script order
//! - Session reconciliation between a cached identity and the account
//!   service, including offline fallback and the one-time welcome grant
//! - Persisted voice settings and the official voice catalog
//!
//! ## Example
//!
//! ```rust,no_run
//! use voiceover_core::{Services, SynthesisOptions, VoiceoverConfig};
//!
//! #[tokio::main]
//! async fn main() -> voiceover_core::VoiceoverResult<()> {
//!     let services = Services::from_config(VoiceoverConfig::from_env()?)?;
//!
//!     let outcome = services.auth.check_session().await;
//!     println!("Signed in: {}", outcome.is_authenticated());
//!
//!     let settings = services.settings.load().await;
//!     let audio = services
//!         .synthesis
//!         .synthesize("Hello, world!", &settings.voice_id, settings.synthesis_options())
//!         .await?;
//!     println!("{} bytes of {}", audio.len(), audio.encoding);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod auth;
pub mod chunker;
pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod provider;
pub mod services;
pub mod session_cache;
pub mod settings;
pub mod storage;
pub mod synthesis;
pub mod voices;

// Re-export main types for convenience
pub use account::{AccountService, AppwriteAccount, OAuthProvider};
pub use auth::{
    AuthBrowser, AuthEvent, AuthOutcome, AuthPhase, AuthReconciler, AuthState, BrowserResult,
};
pub use chunker::{
    chunk_text, ChunkBounds, TextChunk, TextChunker, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
pub use config::{AccountConfig, ProviderConfig, SessionConfig, StorageConfig, VoiceoverConfig};
pub use error::{VoiceoverError, VoiceoverResult};
pub use identity::{Identity, Preferences};
pub use network::{NetworkProbe, TcpProbe};
pub use provider::{
    basic_auth_header, AudioEncoding, InworldClient, SpeechProvider, SynthesisRequest,
};
pub use services::Services;
pub use session_cache::{SessionCache, USER_STORAGE_KEY};
pub use settings::{SettingsStore, VoiceSettings, SETTINGS_STORAGE_KEY};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use synthesis::{AudioPayload, SynthesisOptions, SynthesisOrchestrator};
pub use voices::{Gender, Voice, VoiceCatalog, DEFAULT_VOICE_ID};

/// Version information for the voiceover-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
