//! Application service graph, built once at startup.

use crate::account::{AccountService, AppwriteAccount};
use crate::auth::AuthReconciler;
use crate::config::VoiceoverConfig;
use crate::error::VoiceoverResult;
use crate::network::{NetworkProbe, TcpProbe};
use crate::provider::{InworldClient, SpeechProvider};
use crate::session_cache::SessionCache;
use crate::settings::SettingsStore;
use crate::storage::{FileStore, KeyValueStore};
use crate::synthesis::SynthesisOrchestrator;
use crate::voices::VoiceCatalog;
use std::sync::Arc;
use tracing::info;

/// Shared handles to every core component
#[derive(Debug, Clone)]
pub struct Services {
    /// Configuration the graph was built from
    pub config: Arc<VoiceoverConfig>,
    /// Script to audio pipeline
    pub synthesis: Arc<SynthesisOrchestrator>,
    /// Session state and login operations
    pub auth: Arc<AuthReconciler>,
    /// Persisted voice settings
    pub settings: SettingsStore,
    /// Selectable voices
    pub voices: VoiceCatalog,
}

impl Services {
    /// Build the production graph: file storage, Inworld and Appwrite
    /// clients, and a TCP reachability probe
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the storage
    /// directory cannot be created, or a client cannot be built
    pub fn from_config(config: VoiceoverConfig) -> VoiceoverResult<Self> {
        config.validate()?;

        let data_dir = config.storage.resolve_data_dir()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&data_dir)?);
        let provider: Arc<dyn SpeechProvider> = Arc::new(InworldClient::new(&config.provider)?);
        let account: Arc<dyn AccountService> = Arc::new(AppwriteAccount::new(&config.account)?);

        let timeout = config.session.probe_timeout();
        let probe = match &config.session.probe_target {
            Some(target) => TcpProbe::new(target.clone(), timeout),
            None => TcpProbe::from_url(&config.account.endpoint, timeout)?,
        };
        info!(
            "Storage at {}, reachability probe {}",
            data_dir.display(),
            probe.target()
        );

        Self::with_components(config, store, provider, account, Arc::new(probe))
    }

    /// Build the graph over caller-supplied backends
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk bounds or concurrency ceiling are invalid
    pub fn with_components(
        config: VoiceoverConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn SpeechProvider>,
        account: Arc<dyn AccountService>,
        probe: Arc<dyn NetworkProbe>,
    ) -> VoiceoverResult<Self> {
        let synthesis =
            SynthesisOrchestrator::new(provider, config.provider.clone(), config.chunking)?;
        let auth = AuthReconciler::new(
            account,
            SessionCache::new(store.clone()),
            probe,
            config.session.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            synthesis: Arc::new(synthesis),
            auth: Arc::new(auth),
            settings: SettingsStore::new(store),
            voices: VoiceCatalog::official(),
        })
    }
}
