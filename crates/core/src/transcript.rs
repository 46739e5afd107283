//! Transcript Model and Upload
//!
//! A transcript is the durable record of one completed interview: every topic's
//! conversation, stamped with the session id and the UTC completion time.

use crate::storage::TranscriptStore;
use crate::topic::{Message, Topic};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{error, info};
use uuid::Uuid;

/// The conversation held for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicThread {
    pub topic: String,
    pub messages: Vec<Message>,
}

/// Per-topic message history, kept in script order.
///
/// Serializes as a JSON object keyed by topic name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicHistory {
    threads: Vec<TopicThread>,
}

impl TopicHistory {
    /// Creates an empty thread for every topic.
    pub fn for_topics(topics: &[Topic]) -> Self {
        Self {
            threads: topics
                .iter()
                .map(|t| TopicThread {
                    topic: t.name.clone(),
                    messages: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn messages(&self, index: usize) -> &[Message] {
        self.threads
            .get(index)
            .map(|t| t.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn threads(&self) -> &[TopicThread] {
        &self.threads
    }

    /// Appends to the thread at `index`. Threads are never reordered or edited.
    pub(crate) fn push(&mut self, index: usize, message: Message) {
        if let Some(thread) = self.threads.get_mut(index) {
            thread.messages.push(message);
        }
    }
}

impl Serialize for TopicHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.threads.iter().map(|t| (&t.topic, &t.messages)))
    }
}

/// Snapshot written to storage once an interview is finished.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub transcript: TopicHistory,
}

impl Transcript {
    /// The remote file name for this transcript, e.g. `transcript_<uuid>.json`.
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}{}.json", prefix, self.session_id)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Serializes and stores a transcript, reporting success as a boolean.
///
/// Failures are logged and returned as `false`; the caller still treats the
/// interview as complete.
pub async fn upload_transcript(
    store: &dyn TranscriptStore,
    transcript: &Transcript,
    prefix: &str,
) -> bool {
    let file_name = transcript.file_name(prefix);
    let bytes = match transcript.to_json_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(session_id = %transcript.session_id, error = ?e, "Failed to serialize transcript");
            return false;
        }
    };

    match store.upload(&file_name, bytes).await {
        Ok(true) => {
            info!(session_id = %transcript.session_id, %file_name, "Transcript uploaded");
            true
        }
        Ok(false) => {
            error!(session_id = %transcript.session_id, %file_name, "Transcript upload was rejected");
            false
        }
        Err(e) => {
            error!(session_id = %transcript.session_id, %file_name, error = ?e, "Transcript upload failed");
            false
        }
    }
}
