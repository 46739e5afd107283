//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the session
//! registry and the clients every handler needs.

use crate::registry::SessionRegistry;
use screener_core::{
    llm_client::CompletionGenerator, quota::QuotaGuard, storage::TranscriptStore,
    topic::InterviewScript,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub completions: CompletionGenerator,
    pub store: Arc<dyn TranscriptStore>,
    pub quota: Arc<QuotaGuard>,
    pub script: Arc<InterviewScript>,
    pub transcript_prefix: Arc<String>,
}
