//! Axum Handlers for the REST API
//!
//! Each request is one discrete event on an interview session: starting it,
//! viewing it, submitting an answer, or re-driving a reply that failed.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use screener_core::{
    interview::{Advance, InterviewError, InterviewPhase, InterviewSession},
    transcript::upload_transcript,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    models::{ErrorResponse, SessionView, SubmitMessagePayload, TurnResponse},
    registry::SessionHandle,
    state::AppState,
};

pub const TRANSCRIPT_SAVED_NOTICE: &str = "Interview complete. Transcript saved. Thank you!";
pub const TRANSCRIPT_FAILED_NOTICE: &str =
    "Interview complete, but failed to save transcript.";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    InternalServerError(anyhow::Error),
}

impl ApiError {
    fn from_interview(err: InterviewError) -> Self {
        match err {
            InterviewError::EmptyInput => ApiError::BadRequest(err.to_string()),
            InterviewError::Complete
            | InterviewError::ReplyPending
            | InterviewError::NoPendingInput => ApiError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::ServiceUnavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse { message }),
            )
                .into_response(),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))
}

/// Asks the model for the outstanding reply and applies it to the session.
///
/// A model failure leaves the session awaiting a reply so the turn can be
/// re-driven. On the final topic change the transcript is uploaded once and
/// the session leaves the registry; an upload failure is reported but does
/// not undo completion. The returned view is the last one the candidate sees.
async fn drive_reply(
    state: &AppState,
    session: &mut InterviewSession,
) -> Result<TurnResponse, ApiError> {
    let request = session
        .pending_completion(&state.script)
        .ok_or_else(|| ApiError::from_interview(InterviewError::NoPendingInput))?;

    let reply = state.completions.generate(&request).await?;
    let advance = session
        .receive_reply(&reply, &state.script)
        .map_err(ApiError::from_interview)?;

    let (transcript_saved, notice) = match &advance {
        Advance::Stay => (None, None),
        Advance::NextTopic(topic) => {
            info!(%topic, "Moving to next topic");
            (None, None)
        }
        Advance::Completed => {
            let transcript = session.transcript(Utc::now());
            let saved =
                upload_transcript(state.store.as_ref(), &transcript, &state.transcript_prefix)
                    .await;
            if saved {
                info!("Interview complete; transcript saved");
            } else {
                warn!("Interview complete; transcript was not saved");
            }
            let notice = if saved {
                TRANSCRIPT_SAVED_NOTICE
            } else {
                TRANSCRIPT_FAILED_NOTICE
            };
            (Some(saved), Some(notice.to_string()))
        }
    };

    let view = SessionView::new(session, &state.script);
    if advance == Advance::Completed {
        state.sessions.remove(session.id()).await;
        let remaining = state.sessions.len().await;
        info!(remaining, "Completed session released");
    }

    Ok(TurnResponse {
        reply,
        advanced: advance != Advance::Stay,
        transcript_saved,
        notice,
        session: view,
    })
}

/// Start a new interview.
///
/// The interview quota is checked first; if it is exhausted or cannot be
/// verified, no session is created.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created with the first question", body = SessionView),
        (status = 503, description = "Interview limit reached or unverifiable", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let quota = state.quota.check().await;
    if let Some(message) = quota.user_message() {
        warn!(?quota, "Refusing to start interview");
        return Err(ApiError::ServiceUnavailable(message));
    }

    let (session_id, handle) = state.sessions.create(&state.script).await;
    let session = handle.lock().await;
    info!(%session_id, "Interview session created");

    Ok((
        StatusCode::CREATED,
        Json(SessionView::new(&session, &state.script)),
    ))
}

/// Get the current topic and conversation of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found or already finished", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = find_session(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView::new(&session, &state.script)))
}

/// Submit the candidate's answer and receive the interviewer's reply.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = SubmitMessagePayload,
    responses(
        (status = 200, description = "Reply generated", body = TurnResponse),
        (status = 400, description = "Empty input", body = ErrorResponse),
        (status = 404, description = "Session not found or already finished", body = ErrorResponse),
        (status = 409, description = "Interview complete or reply pending", body = ErrorResponse),
        (status = 500, description = "Model call failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip_all, fields(session_id = %id))]
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitMessagePayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;

    session
        .submit_input(&payload.text)
        .map_err(ApiError::from_interview)?;
    info!(topic_index = session.topic_index(), "Candidate input recorded");

    Ok(Json(drive_reply(&state, &mut session).await?))
}

/// Retry the model call for an answer whose reply previously failed.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reply",
    responses(
        (status = 200, description = "Reply generated", body = TurnResponse),
        (status = 404, description = "Session not found or already finished", body = ErrorResponse),
        (status = 409, description = "No reply is pending", body = ErrorResponse),
        (status = 500, description = "Model call failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip_all, fields(session_id = %id))]
pub async fn retry_reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;

    if session.phase() != InterviewPhase::AwaitingReply {
        return Err(ApiError::Conflict(
            InterviewError::NoPendingInput.to_string(),
        ));
    }

    Ok(Json(drive_reply(&state, &mut session).await?))
}
