//! Deadline wrapper for any session store.
//!
//! Every call is bounded by the configured timeout; an elapsed deadline
//! surfaces as `StoreError::Timeout` instead of hanging the connection.

use super::{RosterChange, Session, SessionStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use stormer_proto::Idea;

pub struct TimedStore {
    inner: Arc<dyn SessionStore>,
    limit: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn SessionStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn run<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.limit, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.limit))?
    }
}

#[async_trait]
impl SessionStore for TimedStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        self.run(self.inner.create(session)).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>, StoreError> {
        self.run(self.inner.find_by_code(code)).await
    }

    async fn save(&self, session: &Session) -> Result<bool, StoreError> {
        self.run(self.inner.save(session)).await
    }

    async fn delete(&self, code: &str) -> Result<bool, StoreError> {
        self.run(self.inner.delete(code)).await
    }

    async fn count_all(&self) -> Result<usize, StoreError> {
        self.run(self.inner.count_all()).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        self.run(self.inner.list_recent(limit)).await
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        self.run(self.inner.list_all()).await
    }

    async fn add_user(&self, code: &str, username: &str) -> Result<Option<Session>, StoreError> {
        self.run(self.inner.add_user(code, username)).await
    }

    async fn remove_user(&self, code: &str, username: &str) -> Result<RosterChange, StoreError> {
        self.run(self.inner.remove_user(code, username)).await
    }

    async fn push_idea(&self, code: &str, idea: Idea) -> Result<Option<Idea>, StoreError> {
        self.run(self.inner.push_idea(code, idea)).await
    }

    async fn toggle_todo(&self, code: &str, id: &str) -> Result<Option<Idea>, StoreError> {
        self.run(self.inner.toggle_todo(code, id)).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.run(self.inner.purge_expired(now)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Store whose lookups never finish.
    struct Stalled;

    #[async_trait]
    impl SessionStore for Stalled {
        fn backend(&self) -> &'static str {
            "stalled"
        }
        async fn create(&self, _: Session) -> Result<Session, StoreError> {
            std::future::pending().await
        }
        async fn find_by_code(&self, _: &str) -> Result<Option<Session>, StoreError> {
            std::future::pending().await
        }
        async fn save(&self, _: &Session) -> Result<bool, StoreError> {
            std::future::pending().await
        }
        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            std::future::pending().await
        }
        async fn count_all(&self) -> Result<usize, StoreError> {
            std::future::pending().await
        }
        async fn list_recent(&self, _: usize) -> Result<Vec<Session>, StoreError> {
            std::future::pending().await
        }
        async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
            std::future::pending().await
        }
        async fn add_user(&self, _: &str, _: &str) -> Result<Option<Session>, StoreError> {
            std::future::pending().await
        }
        async fn remove_user(&self, _: &str, _: &str) -> Result<RosterChange, StoreError> {
            std::future::pending().await
        }
        async fn push_idea(&self, _: &str, _: Idea) -> Result<Option<Idea>, StoreError> {
            std::future::pending().await
        }
        async fn toggle_todo(&self, _: &str, _: &str) -> Result<Option<Idea>, StoreError> {
            std::future::pending().await
        }
        async fn purge_expired(&self, _: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let store = TimedStore::new(Arc::new(Stalled), Duration::from_millis(20));
        let err = store.find_by_code("ABC123").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let inner = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        let store = TimedStore::new(inner, Duration::from_secs(1));
        let session = Session::new("ABC123", "t", Default::default(), "c1", "alice");
        store.create(session).await.unwrap();
        assert_eq!(store.count_all().await.unwrap(), 1);
        assert_eq!(store.backend(), "memory");
    }
}
