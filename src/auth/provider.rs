//! Identity provider calls: authorization URL, code exchange, token refresh

use crate::auth::{AuthError, Credential};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// OAuth client registration, as downloaded from the provider console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecret {
    /// Reads an `{"installed": {...}}` or `{"web": {...}}` client secret file
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ClientSecret(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|message| AuthError::ClientSecret(format!("{}: {}", path.display(), message)))
    }

    fn from_json(content: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client section".to_string())
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Client for the identity provider's authorization and token endpoints
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    client: Client,
    secret: ClientSecret,
    scopes: Vec<String>,
}

impl IdentityProvider {
    pub fn new(client: Client, secret: ClientSecret, scopes: Vec<String>) -> Self {
        Self {
            client,
            secret,
            scopes,
        }
    }

    /// Builds the consent URL the operator opens in a browser
    ///
    /// Requests offline access and forces the consent screen so the provider
    /// always returns a refresh token.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.secret.auth_uri).map_err(|e| {
            AuthError::ClientSecret(format!("invalid auth_uri '{}': {}", self.secret.auth_uri, e))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.secret.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Exchanges an authorization code for a credential
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
        ];
        let response = self.token_request(&form).await?;
        self.to_credential(response, None)
    }

    /// Mints a new access token from a refresh token
    ///
    /// A response without a refresh token keeps the one passed in.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
        ];
        let response = self.token_request(&form).await?;
        self.to_credential(response, Some(refresh_token))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.secret.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("invalid token response: {}", e)))
    }

    fn to_credential(
        &self,
        response: TokenResponse,
        previous_refresh: Option<&str>,
    ) -> Result<Credential, AuthError> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::RefreshFailed(format!(
                    "token endpoint returned an unusable expires_in of {}",
                    response.expires_in
                ))
            })?;

        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.scopes.iter().cloned().collect(),
        };

        Ok(Credential {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at,
            scopes,
        })
    }
}
