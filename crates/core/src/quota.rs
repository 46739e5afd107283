//! Completion Quota Guard
//!
//! Caps the total number of interviews by counting transcripts already in
//! storage. The check fails closed: if the count cannot be verified, the
//! guard blocks just as if the ceiling had been reached.

use crate::storage::TranscriptStore;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_INTERVIEW_LIMIT: usize = 10_000;
pub const DEFAULT_TRANSCRIPT_PREFIX: &str = "transcript_";

/// Result of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaStatus {
    /// Fewer than `limit` transcripts exist.
    Available { used: usize, limit: usize },
    /// The ceiling has been reached.
    Reached { used: usize, limit: usize },
    /// The listing call failed, so the count is unknown.
    Unverified { reason: String },
}

impl QuotaStatus {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, QuotaStatus::Available { .. })
    }

    /// The message shown to a candidate when the guard blocks.
    pub fn user_message(&self) -> Option<String> {
        match self {
            QuotaStatus::Available { .. } => None,
            QuotaStatus::Reached { limit, .. } => Some(format!(
                "The application has reached its maximum of {} interviews and is now shut down.",
                limit
            )),
            QuotaStatus::Unverified { .. } => {
                Some("Unable to verify interview count from storage.".to_string())
            }
        }
    }
}

pub struct QuotaGuard {
    store: Arc<dyn TranscriptStore>,
    prefix: String,
    limit: usize,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn TranscriptStore>, prefix: impl Into<String>, limit: usize) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    #[instrument(skip(self), fields(prefix = %self.prefix, limit = self.limit))]
    pub async fn check(&self) -> QuotaStatus {
        let names = match self.store.list_files().await {
            Ok(names) => names,
            Err(e) => {
                error!(error = ?e, "Unable to verify interview count");
                return QuotaStatus::Unverified {
                    reason: e.to_string(),
                };
            }
        };

        let used = names
            .iter()
            .filter(|name| name.starts_with(&self.prefix))
            .count();

        if used >= self.limit {
            warn!(used, "Interview limit reached");
            QuotaStatus::Reached {
                used,
                limit: self.limit,
            }
        } else {
            info!(used, "Interview quota available");
            QuotaStatus::Available {
                used,
                limit: self.limit,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockTranscriptStore;

    fn guard_with(names: Vec<String>, limit: usize) -> QuotaGuard {
        let mut store = MockTranscriptStore::new();
        store
            .expect_list_files()
            .times(1)
            .returning(move || Ok(names.clone()));
        QuotaGuard::new(Arc::new(store), DEFAULT_TRANSCRIPT_PREFIX, limit)
    }

    #[tokio::test]
    async fn test_counts_only_prefixed_files() {
        let names = vec![
            "transcript_a.json".to_string(),
            "transcript_b.json".to_string(),
            "readme.txt".to_string(),
            "old_transcript_c.json".to_string(),
        ];
        let status = guard_with(names, 3).check().await;
        assert_eq!(status, QuotaStatus::Available { used: 2, limit: 3 });
        assert!(!status.is_blocked());
        assert_eq!(status.user_message(), None);
    }

    #[tokio::test]
    async fn test_blocks_at_ceiling() {
        let names: Vec<String> = (0..DEFAULT_INTERVIEW_LIMIT)
            .map(|i| format!("transcript_{}.json", i))
            .collect();
        let status = guard_with(names, DEFAULT_INTERVIEW_LIMIT).check().await;
        assert_eq!(
            status,
            QuotaStatus::Reached {
                used: 10_000,
                limit: 10_000
            }
        );
        assert!(status.is_blocked());
        assert!(status.user_message().unwrap().contains("10000 interviews"));
    }

    #[tokio::test]
    async fn test_listing_failure_fails_closed() {
        let mut store = MockTranscriptStore::new();
        store
            .expect_list_files()
            .returning(|| Err(anyhow::anyhow!("list_folder returned status 500")));
        let status = QuotaGuard::new(Arc::new(store), "transcript_", 10)
            .check()
            .await;
        assert!(status.is_blocked());
        assert!(matches!(status, QuotaStatus::Unverified { ref reason } if reason.contains("500")));
        assert_eq!(
            status.user_message().unwrap(),
            "Unable to verify interview count from storage."
        );
    }
}
