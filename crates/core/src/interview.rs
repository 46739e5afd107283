//! Interview Session State Machine
//!
//! An `InterviewSession` walks a candidate through the topics of an
//! `InterviewScript`. It is driven by two events: the candidate submitting
//! input, and the model's reply arriving. The topic index only ever grows,
//! and each topic's conversation is append-only.

use crate::topic::{InterviewScript, Message};
use crate::transcript::{TopicHistory, Transcript};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Where a session is in its request/reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    /// Waiting for the candidate to answer the latest question.
    AwaitingInput,
    /// Candidate input was recorded; a model reply is outstanding.
    AwaitingReply,
    /// Every topic has been closed.
    Complete,
}

/// Illegal transitions on an `InterviewSession`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterviewError {
    #[error("The interview is already complete")]
    Complete,
    #[error("A reply to the previous answer is still pending")]
    ReplyPending,
    #[error("No candidate input is awaiting a reply")]
    NoPendingInput,
    #[error("Input must not be empty")]
    EmptyInput,
}

/// What the sequencer decided after a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The reply did not close the topic; wait for more input.
    Stay,
    /// The topic was closed and the named topic was opened.
    NextTopic(String),
    /// The last topic was closed. Returned once per session.
    Completed,
}

/// The data needed to ask the model for the next question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub topic: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct InterviewSession {
    id: Uuid,
    topic_index: usize,
    history: TopicHistory,
    phase: InterviewPhase,
}

impl InterviewSession {
    /// Starts a session on the first topic with its opening question already asked.
    pub fn new(id: Uuid, script: &InterviewScript) -> Self {
        let mut session = Self {
            id,
            topic_index: 0,
            history: TopicHistory::for_topics(script.topics()),
            phase: InterviewPhase::AwaitingInput,
        };
        if script.is_empty() {
            session.phase = InterviewPhase::Complete;
        } else {
            session.seed_current(script);
        }
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic_index(&self) -> usize {
        self.topic_index
    }

    pub fn phase(&self) -> InterviewPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == InterviewPhase::Complete
    }

    pub fn history(&self) -> &TopicHistory {
        &self.history
    }

    /// Name of the active topic, or `None` once the interview is complete.
    pub fn current_topic<'a>(&self, script: &'a InterviewScript) -> Option<&'a str> {
        if self.is_complete() {
            return None;
        }
        script.topic(self.topic_index).map(|t| t.name.as_str())
    }

    /// Messages of the active topic, or of the last topic once complete.
    pub fn current_messages(&self) -> &[Message] {
        let index = if self.is_complete() {
            self.topic_index.saturating_sub(1)
        } else {
            self.topic_index
        };
        self.history.messages(index)
    }

    /// Records the candidate's answer and marks a model reply as outstanding.
    pub fn submit_input(&mut self, text: &str) -> Result<(), InterviewError> {
        match self.phase {
            InterviewPhase::Complete => return Err(InterviewError::Complete),
            InterviewPhase::AwaitingReply => return Err(InterviewError::ReplyPending),
            InterviewPhase::AwaitingInput => {}
        }
        if text.trim().is_empty() {
            return Err(InterviewError::EmptyInput);
        }

        self.history.push(self.topic_index, Message::user(text));
        self.phase = InterviewPhase::AwaitingReply;
        Ok(())
    }

    /// The topic and full conversation to send to the model, if a reply is outstanding.
    pub fn pending_completion(&self, script: &InterviewScript) -> Option<CompletionRequest> {
        if self.phase != InterviewPhase::AwaitingReply {
            return None;
        }
        let topic = script.topic(self.topic_index)?;
        Some(CompletionRequest {
            topic: topic.name.clone(),
            history: self.history.messages(self.topic_index).to_vec(),
        })
    }

    /// Records the model's reply and decides whether to move to the next topic.
    pub fn receive_reply(
        &mut self,
        reply: &str,
        script: &InterviewScript,
    ) -> Result<Advance, InterviewError> {
        match self.phase {
            InterviewPhase::Complete => return Err(InterviewError::Complete),
            InterviewPhase::AwaitingInput => return Err(InterviewError::NoPendingInput),
            InterviewPhase::AwaitingReply => {}
        }

        self.history.push(self.topic_index, Message::assistant(reply));

        if !script.is_terminal(reply) {
            self.phase = InterviewPhase::AwaitingInput;
            return Ok(Advance::Stay);
        }

        self.topic_index += 1;
        match script.topic(self.topic_index) {
            Some(next) => {
                self.phase = InterviewPhase::AwaitingInput;
                self.seed_current(script);
                Ok(Advance::NextTopic(next.name.clone()))
            }
            None => {
                self.phase = InterviewPhase::Complete;
                Ok(Advance::Completed)
            }
        }
    }

    /// Snapshot of every topic's conversation for durable storage.
    pub fn transcript(&self, timestamp: DateTime<Utc>) -> Transcript {
        Transcript {
            session_id: self.id,
            timestamp,
            transcript: self.history.clone(),
        }
    }

    fn seed_current(&mut self, script: &InterviewScript) {
        if let Some(topic) = script.topic(self.topic_index) {
            if self.history.messages(self.topic_index).is_empty() {
                self.history
                    .push(self.topic_index, Message::assistant(&topic.opening_prompt));
            }
        }
    }
}
