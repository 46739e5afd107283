//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, MessageRole, MessageView, SessionPhase, SessionView,
        SubmitMessagePayload, TurnResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::submit_message,
        handlers::retry_reply,
    ),
    components(
        schemas(SessionView, MessageView, MessageRole, SessionPhase, SubmitMessagePayload, TurnResponse, ErrorResponse)
    ),
    tags(
        (name = "Interview Screener API", description = "Topic-by-topic candidate screening interviews")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/messages", post(handlers::submit_message))
        .route("/sessions/{id}/reply", post(handlers::retry_reply))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
