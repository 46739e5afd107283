//! Main Entrypoint for the Interview Screener API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the storage token provider, and proving a refresh exchange works.
//! 3. Checking the interview quota; a blocked quota halts start-up.
//! 4. Building the completion generator.
//! 5. Starting the idle-session sweeper.
//! 6. Constructing the Axum router and applying middleware.
//! 7. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use screener_api::{
    config::Config,
    registry::{SessionRegistry, spawn_idle_sweeper},
    router::create_router,
    startup::{build_token_provider, ensure_quota_open},
    state::AppState,
};
use screener_core::{
    llm_client::{CompletionGenerator, OpenAICompatibleClient},
    quota::QuotaGuard,
    storage::{DropboxStore, TranscriptStore},
    topic::{InterviewScript, default_topics},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Storage and Quota ---
    let http = reqwest::Client::new();
    let tokens = build_token_provider(&config.storage_auth, &http).await?;
    let store: Arc<dyn TranscriptStore> = Arc::new(DropboxStore::new(
        http,
        tokens,
        config.dropbox_api_url.clone(),
        config.dropbox_content_url.clone(),
        config.transcript_folder.clone(),
    ));
    let quota = Arc::new(QuotaGuard::new(
        store.clone(),
        config.transcript_prefix.clone(),
        config.interview_limit,
    ));

    ensure_quota_open(&quota).await?;

    // --- 4. Completion Generator ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.openai_api_key.clone())
        .with_api_base(config.openai_api_base.clone());
    let completions = CompletionGenerator::new(Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
        config.temperature,
    )));

    // --- 5. Session Registry ---
    let sessions = Arc::new(SessionRegistry::new());
    spawn_idle_sweeper(sessions.clone(), config.session_idle_timeout);

    let app_state = Arc::new(AppState {
        sessions,
        completions,
        store,
        quota,
        script: Arc::new(InterviewScript::new(
            default_topics(),
            &config.terminal_phrase,
        )),
        transcript_prefix: Arc::new(config.transcript_prefix.clone()),
    });

    // --- 6. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 7. Start Server ---
    info!(
        model = %config.chat_model,
        storage_auth = ?config.storage_auth,
        folder = %config.transcript_folder,
        idle_timeout = ?config.session_idle_timeout,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
