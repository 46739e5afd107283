//! API Models
//!
//! Request and response bodies for the REST API, annotated with `utoipa` for
//! OpenAPI generation.

use screener_core::{
    interview::{InterviewPhase, InterviewSession},
    topic::{InterviewScript, Message, Role},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    AwaitingInput,
    AwaitingReply,
    Complete,
}

impl From<InterviewPhase> for SessionPhase {
    fn from(phase: InterviewPhase) -> Self {
        match phase {
            InterviewPhase::AwaitingInput => SessionPhase::AwaitingInput,
            InterviewPhase::AwaitingReply => SessionPhase::AwaitingReply,
            InterviewPhase::Complete => SessionPhase::Complete,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Assistant,
    User,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Assistant => MessageRole::Assistant,
            Role::User => MessageRole::User,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct MessageView {
    #[schema(example = "assistant")]
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for MessageView {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.into(),
            content: msg.content.clone(),
        }
    }
}

/// What the candidate sees: the active topic and its conversation so far.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    /// Absent once every topic is done.
    #[schema(example = "Problem Solving")]
    pub topic: Option<String>,
    pub topic_index: usize,
    pub topic_count: usize,
    pub phase: SessionPhase,
    pub messages: Vec<MessageView>,
}

impl SessionView {
    pub fn new(session: &InterviewSession, script: &InterviewScript) -> Self {
        Self {
            session_id: session.id(),
            topic: session.current_topic(script).map(str::to_string),
            topic_index: session.topic_index(),
            topic_count: script.len(),
            phase: session.phase().into(),
            messages: session
                .current_messages()
                .iter()
                .map(MessageView::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitMessagePayload {
    #[schema(example = "I fixed a production outage")]
    pub text: String,
}

/// Outcome of one candidate turn.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TurnResponse {
    /// The interviewer's reply to the submitted input.
    pub reply: String,
    /// True if the reply closed the topic.
    pub advanced: bool,
    /// Set only when the interview just completed.
    pub transcript_saved: Option<bool>,
    /// Message for the candidate when the interview just completed.
    pub notice: Option<String>,
    pub session: SessionView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
