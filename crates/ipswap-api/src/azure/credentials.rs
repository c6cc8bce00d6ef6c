//! Service principal token acquisition
//!
//! Tokens are fetched with the OAuth2 client credentials grant and reused
//! until shortly before they expire.

use super::error::{AzureError, Result};
use crate::config::{AzureCredentials, SecretString};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens are refreshed this long before Entra ID would reject them
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: SecretString,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<ExpiresIn>,
}

/// The v2 endpoint sends a number, older tenants a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> Option<u64> {
        match self {
            ExpiresIn::Seconds(secs) => Some(*secs),
            ExpiresIn::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Client credentials token source for Azure Resource Manager
pub struct TokenCredential {
    http_client: reqwest::Client,
    token_url: String,
    scope: String,
    client_id: String,
    client_secret: SecretString,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenCredential {
    pub fn new(
        http_client: reqwest::Client,
        authority_host: &str,
        resource_manager_endpoint: &str,
        credentials: &AzureCredentials,
    ) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            credentials.tenant_id
        );
        let scope = format!("{}/.default", resource_manager_endpoint.trim_end_matches('/'));

        Self {
            http_client,
            token_url,
            scope,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            cache: Mutex::new(None),
        }
    }

    /// Return a bearer token, requesting a new one when the cached token is near expiry
    pub async fn token(&self) -> Result<SecretString> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
            debug!("Cached Azure token is about to expire, refreshing");
        }

        let fresh = self.request_token().await?;
        let token = fresh.access_token.clone();
        *cache = Some(fresh);

        Ok(token)
    }

    /// Forget the cached token so the next call fetches a new one
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken> {
        debug!(url = %self.token_url, "Requesting Azure access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AzureError::Authentication {
                message: format!("Token request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let parsed: TokenErrorResponse = serde_json::from_str(&error_text).unwrap_or_default();
            let message = match (parsed.error.is_empty(), parsed.error_description.is_empty()) {
                (false, false) => format!("{}: {}", parsed.error, parsed.error_description),
                (false, true) => parsed.error,
                _ => format!("Token endpoint returned {status}: {error_text}"),
            };
            return Err(AzureError::Authentication { message });
        }

        let body: TokenResponse = response.json().await.map_err(|e| AzureError::Authentication {
            message: format!("Failed to parse token response: {e}"),
        })?;

        let lifetime = body
            .expires_in
            .as_ref()
            .and_then(ExpiresIn::seconds)
            .map(Duration::from_secs)
            .unwrap_or(REFRESH_MARGIN);

        info!(
            expires_in_secs = lifetime.as_secs(),
            "Acquired Azure access token"
        );

        Ok(CachedToken {
            access_token: SecretString::new(body.access_token),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}
