//! Persisted snapshot of the last verified identity.
//!
//! Every operation is best-effort: storage failures and unreadable snapshots
//! are logged and behave like a cache miss or a skipped write.

use crate::identity::Identity;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key holding the serialized identity
pub const USER_STORAGE_KEY: &str = "auth_user";

/// Identity cache over a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionCache {
    /// Cache stored under [`USER_STORAGE_KEY`]
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, USER_STORAGE_KEY)
    }

    /// Cache stored under a custom key
    #[must_use]
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Last saved identity, if any
    pub async fn load(&self) -> Option<Identity> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cached identity: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Ignoring unreadable cached identity: {}", e);
                None
            }
        }
    }

    /// Replace the cached identity
    pub async fn save(&self, identity: &Identity) {
        let raw = match serde_json::to_string(identity) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize identity: {}", e);
                return;
            }
        };

        match self.store.set(&self.key, &raw).await {
            Ok(()) => debug!("Cached identity {}", identity.id),
            Err(e) => warn!("Failed to cache identity: {}", e),
        }
    }

    /// Forget the cached identity
    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key).await {
            warn!("Failed to clear cached identity: {}", e);
        }
    }
}
