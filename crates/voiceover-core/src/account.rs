//! Remote account (identity) service.
//!
//! [`AccountService`] lists the identity operations the session logic
//! consumes. [`AppwriteAccount`] implements them against an Appwrite-style
//! REST API, keeping the session cookie in the HTTP client's cookie store.

use crate::config::AccountConfig;
use crate::error::{VoiceoverError, VoiceoverResult};
use crate::identity::{Identity, Preferences};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// External identity providers for the OAuth flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    /// Google accounts
    Google,
    /// Sign in with Apple
    Apple,
    /// GitHub accounts
    Github,
}

impl OAuthProvider {
    /// Provider name as used in service URLs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity operations provided by the account backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Identity behind the current session
    ///
    /// # Errors
    ///
    /// `AuthInvalid` when there is no valid session; transport errors otherwise
    async fn get(&self) -> VoiceoverResult<Identity>;

    /// Start a session from email and password
    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> VoiceoverResult<()>;

    /// URL that starts the external authorization flow for `provider`
    async fn create_oauth2_token(
        &self,
        provider: OAuthProvider,
        success: &str,
        failure: &str,
    ) -> VoiceoverResult<String>;

    /// Exchange a one-time token for a session
    async fn create_session(&self, user_id: &str, secret: &str) -> VoiceoverResult<()>;

    /// Replace the preferences of the current user
    async fn update_prefs(&self, prefs: &Preferences) -> VoiceoverResult<Identity>;

    /// Delete a session; `"current"` names the active one
    async fn delete_session(&self, session_id: &str) -> VoiceoverResult<()>;

    /// Register a new account
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> VoiceoverResult<Identity>;
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    message: String,
}

/// REST client for an Appwrite-compatible account API
#[derive(Debug, Clone)]
pub struct AppwriteAccount {
    client: Client,
    endpoint: String,
    project_id: String,
}

impl AppwriteAccount {
    /// Create a client for `config.endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the project header is not a valid header value or
    /// the HTTP client cannot be built
    pub fn new(config: &AccountConfig) -> VoiceoverResult<Self> {
        let mut headers = HeaderMap::new();
        let project = HeaderValue::from_str(&config.project_id).map_err(|e| {
            VoiceoverError::configuration(format!("Invalid project ID: {e}"))
        })?;
        headers.insert("X-Appwrite-Project", project);

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                VoiceoverError::configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn send(&self, request: RequestBuilder) -> VoiceoverResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        if status == StatusCode::UNAUTHORIZED {
            debug!("Account service rejected session: {}", message);
            return Err(VoiceoverError::auth_invalid(message));
        }

        warn!("Account service returned {}: {}", status, message);
        Err(VoiceoverError::remote(status.as_u16(), message))
    }

    async fn send_for_identity(&self, request: RequestBuilder) -> VoiceoverResult<Identity> {
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| VoiceoverError::serialization(format!("Malformed account response: {e}")))
    }
}

/// The service's `{message}` when present, the raw body otherwise.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ServiceError>(&body).map_or(body, |e| e.message)
}

#[async_trait]
impl AccountService for AppwriteAccount {
    async fn get(&self) -> VoiceoverResult<Identity> {
        self.send_for_identity(self.client.get(self.url("/account")))
            .await
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> VoiceoverResult<()> {
        let request = self
            .client
            .post(self.url("/account/sessions/email"))
            .json(&json!({ "email": email, "password": password }));
        self.send(request).await?;
        Ok(())
    }

    async fn create_oauth2_token(
        &self,
        provider: OAuthProvider,
        success: &str,
        failure: &str,
    ) -> VoiceoverResult<String> {
        let base = self.url(&format!("/account/tokens/oauth2/{provider}"));
        let url = Url::parse_with_params(
            &base,
            &[
                ("project", self.project_id.as_str()),
                ("success", success),
                ("failure", failure),
            ],
        )
        .map_err(|e| VoiceoverError::oauth_flow(format!("Create OAuth2 token failed: {e}")))?;
        Ok(url.into())
    }

    async fn create_session(&self, user_id: &str, secret: &str) -> VoiceoverResult<()> {
        let request = self
            .client
            .post(self.url("/account/sessions/token"))
            .json(&json!({ "userId": user_id, "secret": secret }));
        self.send(request).await?;
        Ok(())
    }

    async fn update_prefs(&self, prefs: &Preferences) -> VoiceoverResult<Identity> {
        let request = self
            .client
            .patch(self.url("/account/prefs"))
            .json(&json!({ "prefs": prefs }));
        self.send_for_identity(request).await
    }

    async fn delete_session(&self, session_id: &str) -> VoiceoverResult<()> {
        let request = self
            .client
            .delete(self.url(&format!("/account/sessions/{session_id}")));
        self.send(request).await?;
        Ok(())
    }

    async fn create(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> VoiceoverResult<Identity> {
        let request = self.client.post(self.url("/account")).json(&json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        }));
        self.send_for_identity(request).await
    }
}
