//! Session Registry
//!
//! Owns every live interview session, keyed by id. Each session sits behind
//! its own async mutex, so a session never has more than one request in
//! flight while different sessions proceed independently.
//!
//! A session leaves the registry when its interview completes, or when it
//! has been idle longer than the configured timeout.

use screener_core::{interview::InterviewSession, topic::InterviewScript};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

/// Shared handle to one session's state.
pub type SessionHandle = Arc<Mutex<InterviewSession>>;

struct Entry {
    handle: SessionHandle,
    last_active: Instant,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a fresh v4 id, seeded with the first topic.
    pub async fn create(&self, script: &InterviewScript) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(InterviewSession::new(id, script)));
        self.sessions.write().await.insert(
            id,
            Entry {
                handle: handle.clone(),
                last_active: Instant::now(),
            },
        );
        (id, handle)
    }

    /// Looks up a session and marks it as active.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_active = Instant::now();
        Some(entry.handle.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|entry| entry.handle)
    }

    /// Drops sessions untouched for at least `max_idle` and returns how many
    /// were dropped. A session whose handle is still held by a request is kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_active.elapsed() < max_idle || Arc::strong_count(&entry.handle) > 1
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Runs `evict_idle` periodically for the life of the process.
pub fn spawn_idle_sweeper(registry: Arc<SessionRegistry>, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = registry.len().await;
                info!(evicted, remaining, "Evicted idle sessions");
            }
        }
    })
}
