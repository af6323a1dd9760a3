//! Session reconciliation.
//!
//! [`AuthReconciler`] merges the cached identity with the account service's
//! answer into one authoritative state:
//!
//! 1. the cached identity (if any) is published right away as provisional;
//! 2. when the network is unreachable and a cached identity exists, the check
//!    settles on it without any remote call;
//! 3. otherwise the session is verified remotely, the one-time welcome grant
//!    is applied when missing, and the result is persisted.
//!
//! An explicit credential rejection wipes the cache. Any other failure keeps
//! the cached identity. Reconciliation never returns an error; the result is
//! an [`AuthOutcome`]. State is observable through a `watch` channel and
//! transitions are also broadcast as [`AuthEvent`]s.

use crate::account::{AccountService, OAuthProvider};
use crate::config::SessionConfig;
use crate::error::{VoiceoverError, VoiceoverResult};
use crate::identity::Identity;
use crate::network::NetworkProbe;
use crate::session_cache::SessionCache;
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

/// How a session check settled
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The account service confirmed the session
    Verified(Identity),
    /// The session could not be verified; the cached identity is kept
    CachedFallback(Identity),
    /// No usable session
    Unauthenticated,
}

impl AuthOutcome {
    /// Identity the outcome settled on
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Verified(identity) | Self::CachedFallback(identity) => Some(identity),
            Self::Unauthenticated => None,
        }
    }

    /// Whether a user is signed in after this outcome
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }
}

/// Where the reconciler is in its state machine
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPhase {
    /// A check is running and nothing is known yet
    Loading,
    /// A check is running; the cached identity is exposed meanwhile
    Provisional,
    /// The last check (or logout) settled
    Settled(AuthOutcome),
}

/// Snapshot observed by the UI layer
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    /// Current identity, provisional or settled
    pub identity: Option<Identity>,
    /// Whether a check is in progress
    pub is_loading: bool,
    /// State machine position
    pub phase: AuthPhase,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            identity: None,
            is_loading: true,
            phase: AuthPhase::Loading,
        }
    }
}

/// State transitions, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A session check started
    LoadingStarted,
    /// The cached identity was exposed ahead of verification
    Provisional(Identity),
    /// A session check finished; emitted once per check
    LoadingComplete(AuthOutcome),
    /// The user logged out
    LoggedOut,
}

/// Result of the external authorization session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserResult {
    /// The flow reached the redirect URI
    Success {
        /// Full redirect URL, including query parameters
        url: String,
    },
    /// The user cancelled
    Cancel,
    /// The browser was closed before the redirect
    Dismiss,
}

/// Opens the external authorization flow and waits for its redirect
#[async_trait]
pub trait AuthBrowser: Send + Sync {
    /// Open `url` and wait until the flow lands on `redirect_uri` or ends
    async fn open_auth_session(&self, url: &str, redirect_uri: &str) -> BrowserResult;
}

/// Authoritative identity state plus the login/logout operations
pub struct AuthReconciler {
    account: Arc<dyn AccountService>,
    cache: SessionCache,
    probe: Arc<dyn NetworkProbe>,
    config: SessionConfig,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    check_lock: Mutex<()>,
}

impl std::fmt::Debug for AuthReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthReconciler")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthReconciler {
    /// Create a reconciler; the initial state is loading with no identity
    #[must_use]
    pub fn new(
        account: Arc<dyn AccountService>,
        cache: SessionCache,
        probe: Arc<dyn NetworkProbe>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            account,
            cache,
            probe,
            config,
            state,
            events,
            check_lock: Mutex::new(()),
        }
    }

    /// Watch the current state
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Receive state transitions emitted from now on
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Current identity, provisional or settled
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Whether a check is in progress
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Reconcile the cached identity with the account service
    ///
    /// Overlapping calls run one after another.
    pub async fn check_session(&self) -> AuthOutcome {
        let _guard = self.check_lock.lock().await;

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.phase = AuthPhase::Loading;
        });
        self.emit(AuthEvent::LoadingStarted);

        let outcome = self.reconcile().await;

        self.state.send_modify(|state| {
            state.identity = outcome.identity().cloned();
            state.is_loading = false;
            state.phase = AuthPhase::Settled(outcome.clone());
        });
        self.emit(AuthEvent::LoadingComplete(outcome.clone()));

        outcome
    }

    async fn reconcile(&self) -> AuthOutcome {
        let cached = self.cache.load().await;
        if let Some(identity) = &cached {
            debug!("Exposing cached identity {} while verifying", identity.id);
            self.state.send_modify(|state| {
                state.identity = Some(identity.clone());
                state.phase = AuthPhase::Provisional;
            });
            self.emit(AuthEvent::Provisional(identity.clone()));
        }

        if !self.probe.is_connected().await {
            if let Some(identity) = cached {
                info!("Offline, keeping cached identity {}", identity.id);
                return AuthOutcome::CachedFallback(identity);
            }
            debug!("Offline without a cached identity, verifying anyway");
        }

        match self.verify().await {
            Ok(identity) => {
                self.cache.save(&identity).await;
                info!("Session verified for {}", identity.id);
                AuthOutcome::Verified(identity)
            }
            Err(e) if e.is_auth_rejection() => {
                info!("Session rejected: {}", e);
                self.cache.clear().await;
                AuthOutcome::Unauthenticated
            }
            Err(e) => {
                warn!("Session check failed: {}", e);
                cached.map_or(AuthOutcome::Unauthenticated, AuthOutcome::CachedFallback)
            }
        }
    }

    /// Fetch the remote identity, applying the welcome grant once.
    async fn verify(&self) -> VoiceoverResult<Identity> {
        let identity = self.account.get().await?;
        if identity.welcome_credits_awarded() {
            return Ok(identity);
        }

        let amount = self.config.welcome_credits;
        info!("Awarding {} welcome credits to {}", amount, identity.id);
        let prefs = identity.prefs.with_welcome_credits(amount);
        self.account.update_prefs(&prefs).await?;

        self.account.get().await
    }

    /// Sign in with email and password, then check the session
    ///
    /// # Errors
    ///
    /// Returns the account service's error if the session cannot be created
    pub async fn login(&self, email: &str, password: &str) -> VoiceoverResult<AuthOutcome> {
        self.account
            .create_email_password_session(email, password)
            .await?;
        Ok(self.check_session().await)
    }

    /// Register a new account and sign in with it
    ///
    /// # Errors
    ///
    /// Returns the account service's error if registration or login fails
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> VoiceoverResult<AuthOutcome> {
        let user_id = uuid::Uuid::new_v4().simple().to_string();
        self.account.create(&user_id, email, password, name).await?;
        info!("Registered account {}", user_id);
        self.login(email, password).await
    }

    /// End the session locally, and remotely when possible
    ///
    /// Waits for any in-flight `check_session` so a late verification cannot
    /// restore the identity after logout.
    pub async fn logout(&self) {
        let _guard = self.check_lock.lock().await;
        if let Err(e) = self.account.delete_session("current").await {
            debug!("Remote logout failed, clearing local session anyway: {}", e);
        }
        self.cache.clear().await;

        self.state.send_modify(|state| {
            state.identity = None;
            state.is_loading = false;
            state.phase = AuthPhase::Settled(AuthOutcome::Unauthenticated);
        });
        self.emit(AuthEvent::LoggedOut);
        info!("Logged out");
    }

    /// Sign in through an external identity provider
    ///
    /// # Errors
    ///
    /// `OAuthFlowError` when the user abandons the flow or the redirect lacks
    /// `secret` or `userId`; account service errors are propagated. The
    /// loading flag is cleared on every failure.
    pub async fn login_with_oauth(
        &self,
        browser: &dyn AuthBrowser,
        provider: OAuthProvider,
    ) -> VoiceoverResult<AuthOutcome> {
        match self.run_oauth(browser, provider).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("OAuth login with {} failed: {}", provider, e);
                self.state.send_modify(|state| state.is_loading = false);
                Err(e)
            }
        }
    }

    async fn run_oauth(
        &self,
        browser: &dyn AuthBrowser,
        provider: OAuthProvider,
    ) -> VoiceoverResult<AuthOutcome> {
        let redirect = self.config.oauth_redirect_uri.as_str();
        let auth_url = self
            .account
            .create_oauth2_token(provider, redirect, redirect)
            .await?;
        if auth_url.is_empty() {
            return Err(VoiceoverError::oauth_flow("Create OAuth2 token failed"));
        }

        let url = match browser.open_auth_session(&auth_url, redirect).await {
            BrowserResult::Success { url } => url,
            BrowserResult::Cancel => {
                return Err(VoiceoverError::oauth_flow("OAuth flow cancelled"))
            }
            BrowserResult::Dismiss => {
                return Err(VoiceoverError::oauth_flow("OAuth flow dismissed"))
            }
        };

        self.state.send_modify(|state| state.is_loading = true);
        let (user_id, secret) = callback_params(&url)?;
        self.account.create_session(&user_id, &secret).await?;
        Ok(self.check_session().await)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// `userId` and `secret` from an OAuth redirect URL.
fn callback_params(url: &str) -> VoiceoverResult<(String, String)> {
    let parsed = Url::parse(url)
        .map_err(|e| VoiceoverError::oauth_flow(format!("Invalid OAuth callback URL: {e}")))?;

    let mut user_id = None;
    let mut secret = None;
    for (key, value) in parsed.query_pairs() {
        match &*key {
            "userId" if !value.is_empty() => user_id = Some(value.into_owned()),
            "secret" if !value.is_empty() => secret = Some(value.into_owned()),
            _ => {}
        }
    }

    match (user_id, secret) {
        (Some(user_id), Some(secret)) => Ok((user_id, secret)),
        _ => Err(VoiceoverError::oauth_flow("OAuth callback missing params")),
    }
}
