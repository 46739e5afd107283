//! Storage Access Tokens
//!
//! Two ways to get a bearer token for the storage service: a long-lived token
//! from configuration, or a short-lived token exchanged from a refresh token.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// Supplies the bearer credential for storage requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token that never changes for the lifetime of the process.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges a refresh token for a fresh access token on every call.
///
/// Nothing is cached, so each storage operation pays one round-trip to the
/// auth endpoint.
pub struct RefreshingToken {
    http: Client,
    token_url: String,
    refresh_token: String,
    client_id: String,
    client_secret: String,
}

impl RefreshingToken {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            refresh_token: refresh_token.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for RefreshingToken {
    #[instrument(skip(self), fields(token_url = %self.token_url))]
    async fn access_token(&self) -> Result<String> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("Failed to reach the token endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Refresh token exchange failed");
            return Err(anyhow!(
                "Refresh token exchange failed with status {}: {}",
                status,
                body
            ));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token endpoint response")?;
        debug!(expires_in = ?token.expires_in, "Obtained short-lived access token");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refreshing(server: &MockServer) -> RefreshingToken {
        RefreshingToken::new(
            Client::new(),
            format!("{}/oauth2/token", server.uri()),
            "refresh-abc",
            "app-key",
            "app-secret",
        )
    }

    #[tokio::test]
    async fn test_static_token_returns_configured_value() {
        let provider = StaticToken::new("sl.static");
        assert_eq!(provider.access_token().await.unwrap(), "sl.static");
    }

    #[tokio::test]
    async fn test_refresh_exchanges_on_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-abc"))
            .and(body_string_contains("client_id=app-key"))
            .and(body_string_contains("client_secret=app-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "sl.short-lived",
                "token_type": "bearer",
                "expires_in": 14400
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = refreshing(&server);
        assert_eq!(provider.access_token().await.unwrap(), "sl.short-lived");
        assert_eq!(provider.access_token().await.unwrap(), "sl.short-lived");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let err = refreshing(&server).access_token().await.unwrap_err();
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid_grant"));
    }
}
