//! Delegated-access credential acquisition
//!
//! [`AuthFlow`] hands the engine a usable [`Credential`]. A cached credential
//! is reused while it is fresh, refreshed when it is about to expire, and
//! otherwise replaced through the browser consent handshake:
//!
//! 1. Bind a [`CallbackListener`] on the first free candidate port
//! 2. Present the authorization URL through a [`ConsentPrompt`]
//! 3. Wait for the redirect carrying the authorization code
//! 4. Exchange the code at the token endpoint and save the result
//!
//! The listener is released before the code exchange, so the port is free
//! again by the time `obtain` returns or is cancelled.

mod credential;
mod listener;
mod prompt;
mod provider;
mod store;

pub use credential::Credential;
pub use listener::CallbackListener;
pub use prompt::{BrowserPrompt, ConsentPrompt};
pub use provider::{ClientSecret, IdentityProvider};
pub use store::{CredentialStore, FileCredentialStore};

use crate::config::AuthConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("All candidate callback ports are in use: {ports:?}")]
    AllPortsBusy { ports: Vec<u16> },

    #[error("Timed out waiting for the consent callback")]
    Timeout,

    #[error("Consent was denied: {0}")]
    ConsentDenied(String),

    #[error("Token request failed: {0}")]
    RefreshFailed(String),

    #[error("Invalid client secret: {0}")]
    ClientSecret(String),

    #[error("Failed to persist credential: {0}")]
    Persist(String),

    #[error("Callback listener error: {0}")]
    Listener(String),
}

/// Observable state of the auth flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    NoCredential,
    AwaitingUserConsent { port: u16 },
    Authenticated,
    Expiring,
    Refreshing,
    Failed(String),
}

/// Source of credentials for the submission engine
#[async_trait]
pub trait CredentialProvider: Send {
    /// Returns a credential that is valid for at least the refresh margin
    async fn obtain(&mut self) -> Result<Credential, AuthError>;

    /// Forces a refresh after the service rejected `rejected`
    async fn refresh(&mut self, rejected: &Credential) -> Result<Credential, AuthError>;

    /// Returns `current` if it is still fresh, otherwise a refreshed credential
    async fn ensure_fresh(&mut self, current: &Credential) -> Result<Credential, AuthError>;
}

/// Credential acquisition backed by a credential store and the identity provider
pub struct AuthFlow {
    store: Box<dyn CredentialStore>,
    provider: IdentityProvider,
    prompt: Box<dyn ConsentPrompt>,
    candidate_ports: Vec<u16>,
    consent_timeout: Duration,
    refresh_margin: chrono::Duration,
    force_consent: bool,
    state: AuthState,
}

impl AuthFlow {
    /// Creates the flow from configuration, reading the client secret file
    pub fn new(config: &AuthConfig, client: Client) -> Result<Self, AuthError> {
        let mut secret = ClientSecret::from_file(&config.client_secret_path)?;
        if let Some(auth_uri) = &config.auth_uri {
            secret.auth_uri = auth_uri.clone();
        }
        if let Some(token_uri) = &config.token_uri {
            secret.token_uri = token_uri.clone();
        }

        let store = FileCredentialStore::new(&config.credential_path, config.scopes.clone());
        let provider = IdentityProvider::new(client, secret, config.scopes.clone());

        Ok(Self::with_parts(
            Box::new(store),
            provider,
            Box::new(BrowserPrompt),
            config,
        ))
    }

    /// Creates the flow from explicit collaborators
    pub fn with_parts(
        store: Box<dyn CredentialStore>,
        provider: IdentityProvider,
        prompt: Box<dyn ConsentPrompt>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            provider,
            prompt,
            candidate_ports: config.candidate_ports.clone(),
            consent_timeout: config.consent_timeout(),
            refresh_margin: config.refresh_margin(),
            force_consent: false,
            state: AuthState::NoCredential,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Makes the next `obtain` ignore the cached credential and ask for consent
    ///
    /// Nothing is touched until a credential is actually needed; the cached
    /// one is replaced only once consent succeeds.
    pub fn require_consent(&mut self) {
        self.force_consent = true;
    }

    fn transition(&mut self, next: AuthState) {
        if self.state != next {
            tracing::debug!("Auth state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Records a terminal failure for `result` before handing it back
    fn settle(&mut self, result: Result<Credential, AuthError>) -> Result<Credential, AuthError> {
        if let Err(e) = &result {
            self.transition(AuthState::Failed(e.to_string()));
        }
        result
    }

    async fn obtain_inner(&mut self) -> Result<Credential, AuthError> {
        if self.force_consent {
            tracing::info!("Re-authentication requested, ignoring cached credential");
            let credential = self.consent().await?;
            self.force_consent = false;
            return Ok(credential);
        }

        if let Some(cached) = self.store.load()? {
            if !cached.expires_within(self.refresh_margin) {
                tracing::info!("Using cached credential (expires {})", cached.expires_at);
                self.transition(AuthState::Authenticated);
                return Ok(cached);
            }

            self.transition(AuthState::Expiring);
            match cached.refresh_token.as_deref() {
                Some(refresh_token) => match self.refresh_with(refresh_token).await {
                    Ok(credential) => return Ok(credential),
                    Err(e) => {
                        tracing::warn!("Could not refresh cached credential: {}", e);
                    }
                },
                None => tracing::info!("Cached credential is expiring and cannot be refreshed"),
            }
        }

        self.consent().await
    }

    async fn refresh_with(&mut self, refresh_token: &str) -> Result<Credential, AuthError> {
        self.transition(AuthState::Refreshing);
        let credential = self.provider.refresh(refresh_token).await?;
        self.store.save(&credential)?;
        self.transition(AuthState::Authenticated);
        tracing::info!("Credential refreshed (expires {})", credential.expires_at);
        Ok(credential)
    }

    async fn consent(&mut self) -> Result<Credential, AuthError> {
        let expected_state = uuid::Uuid::new_v4().to_string();
        let listener =
            CallbackListener::bind(&self.candidate_ports, expected_state.clone()).await?;
        self.transition(AuthState::AwaitingUserConsent {
            port: listener.port(),
        });

        let redirect_uri = listener.redirect_uri();
        let url = self.provider.authorization_url(&redirect_uri, &expected_state)?;
        self.prompt.present(&url);
        let code = listener.wait_for_callback(self.consent_timeout).await?;

        let credential = self.provider.exchange_code(&code, &redirect_uri).await?;
        self.store.save(&credential)?;
        self.transition(AuthState::Authenticated);
        tracing::info!("Authentication complete");
        Ok(credential)
    }
}

#[async_trait]
impl CredentialProvider for AuthFlow {
    async fn obtain(&mut self) -> Result<Credential, AuthError> {
        let result = self.obtain_inner().await;
        self.settle(result)
    }

    async fn refresh(&mut self, rejected: &Credential) -> Result<Credential, AuthError> {
        let result = match rejected.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh_with(refresh_token).await,
            None => Err(AuthError::RefreshFailed(
                "credential has no refresh token".to_string(),
            )),
        };
        self.settle(result)
    }

    async fn ensure_fresh(&mut self, current: &Credential) -> Result<Credential, AuthError> {
        if !current.expires_within(self.refresh_margin) {
            return Ok(current.clone());
        }
        tracing::debug!("Credential expires at {}, refreshing", current.expires_at);
        self.transition(AuthState::Expiring);
        self.refresh(current).await
    }
}
