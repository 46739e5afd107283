//! Start-up Checks
//!
//! The steps that must succeed before the server accepts a request: obtaining
//! working storage credentials and confirming the interview quota is open.

use crate::config::StorageAuth;
use anyhow::{Context, bail};
use screener_core::{
    quota::{QuotaGuard, QuotaStatus},
    token::{RefreshingToken, StaticToken, TokenProvider},
};
use std::sync::Arc;
use tracing::{error, info};

/// Builds the token provider for the configured auth mode.
///
/// For the refresh flow one exchange is performed up front, so bad
/// credentials stop the process before it accepts any request.
pub async fn build_token_provider(
    auth: &StorageAuth,
    http: &reqwest::Client,
) -> anyhow::Result<Arc<dyn TokenProvider>> {
    match auth {
        StorageAuth::Static { token } => {
            info!("Using static storage token.");
            Ok(Arc::new(StaticToken::new(token.clone())))
        }
        StorageAuth::Refresh {
            refresh_token,
            app_key,
            app_secret,
            token_url,
        } => {
            info!(%token_url, "Using refresh-token storage auth.");
            let provider = RefreshingToken::new(
                http.clone(),
                token_url.clone(),
                refresh_token.clone(),
                app_key.clone(),
                app_secret.clone(),
            );
            provider
                .access_token()
                .await
                .context("Failed to exchange storage refresh token")?;
            Ok(Arc::new(provider))
        }
    }
}

/// Fails if the quota guard would block new interviews.
pub async fn ensure_quota_open(quota: &QuotaGuard) -> anyhow::Result<QuotaStatus> {
    let status = quota.check().await;
    if let Some(message) = status.user_message() {
        error!(?status, limit = quota.limit(), "Interview limit check blocked start-up");
        bail!("Interview Limit Reached: {}", message);
    }
    info!(?status, "Interview quota open");
    Ok(status)
}
