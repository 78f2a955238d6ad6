//! In-memory session store.
//!
//! Sessions live in a `DashMap` keyed by code. Every mutation runs under the
//! entry's shard lock, so each primitive is one atomic read-modify-write.

use super::{RosterChange, Session, SessionStore, StoreError, retention_delta};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use stormer_proto::Idea;

pub struct MemoryStore {
    sessions: DashMap<String, Session>,
    retention: TimeDelta,
}

impl MemoryStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            retention: retention_delta(retention),
        }
    }

    fn live(&self, session: &Session) -> bool {
        !session.is_expired(Utc::now(), self.retention)
    }

    fn live_sessions(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|entry| self.live(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        match self.sessions.entry(session.code.clone()) {
            Entry::Occupied(entry) if self.live(entry.get()) => {
                Err(StoreError::DuplicateCode(session.code))
            }
            Entry::Occupied(mut entry) => {
                // Expired but not yet swept; the code is free again.
                entry.insert(session.clone());
                Ok(session)
            }
            Entry::Vacant(entry) => {
                entry.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .get(code)
            .filter(|s| self.live(s.value()))
            .map(|s| s.value().clone()))
    }

    async fn save(&self, session: &Session) -> Result<bool, StoreError> {
        let Some(mut stored) = self.sessions.get_mut(&session.code) else {
            return Ok(false);
        };
        if !self.live(&stored) {
            return Ok(false);
        }
        stored.topic = session.topic.clone();
        stored.template = session.template;
        stored.users = session.users.clone();
        stored.ideas = session.ideas.clone();
        Ok(true)
    }

    async fn delete(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(code).is_some())
    }

    async fn count_all(&self) -> Result<usize, StoreError> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| self.live(entry.value()))
            .count())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let mut sessions = self.live_sessions();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions = self.live_sessions();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sessions)
    }

    async fn add_user(&self, code: &str, username: &str) -> Result<Option<Session>, StoreError> {
        let Some(mut session) = self.sessions.get_mut(code) else {
            return Ok(None);
        };
        if !self.live(&session) {
            return Ok(None);
        }
        if session.has_user(username) {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        session.users.push(username.to_string());
        Ok(Some(session.clone()))
    }

    async fn remove_user(&self, code: &str, username: &str) -> Result<RosterChange, StoreError> {
        let now = Utc::now();
        let mut change = RosterChange::Missing;
        self.sessions.remove_if_mut(code, |_, session| {
            if session.is_expired(now, self.retention) {
                return false;
            }
            session.users.retain(|u| u != username);
            if session.users.is_empty() {
                change = RosterChange::Closed;
                true
            } else {
                change = RosterChange::Remaining(session.users.clone());
                false
            }
        });
        Ok(change)
    }

    async fn push_idea(&self, code: &str, mut idea: Idea) -> Result<Option<Idea>, StoreError> {
        let Some(mut session) = self.sessions.get_mut(code) else {
            return Ok(None);
        };
        if !self.live(&session) {
            return Ok(None);
        }
        if let Some(id) = idea.todo_id()
            && session.has_todo(id)
        {
            return Err(StoreError::DuplicateIdeaId(id.to_string()));
        }
        idea.normalize();
        session.ideas.push(idea.clone());
        Ok(Some(idea))
    }

    async fn toggle_todo(&self, code: &str, id: &str) -> Result<Option<Idea>, StoreError> {
        let Some(mut session) = self.sessions.get_mut(code) else {
            return Ok(None);
        };
        if !self.live(&session) {
            return Ok(None);
        }
        Ok(session
            .ideas
            .iter_mut()
            .find(|idea| idea.todo_id() == Some(id))
            .map(|idea| {
                idea.toggle();
                idea.clone()
            }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now, self.retention))
            .map(|entry| entry.key().clone())
            .collect();

        let mut purged = Vec::with_capacity(candidates.len());
        for code in candidates {
            if self
                .sessions
                .remove_if(&code, |_, s| s.is_expired(now, self.retention))
                .is_some()
            {
                purged.push(code);
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stormer_proto::Template;

    fn store() -> MemoryStore {
        MemoryStore::new(Duration::from_secs(86400))
    }

    fn session(code: &str) -> Session {
        Session::new(code, "Q3 planning", Template::Todo, "conn-1", "alice")
    }

    #[tokio::test]
    async fn create_rejects_duplicate_code() {
        let store = store();
        store.create(session("ABC123")).await.unwrap();
        let err = store.create(session("ABC123")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCode(code) if code == "ABC123"));
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_user_enforces_uniqueness() {
        let store = store();
        store.create(session("ABC123")).await.unwrap();

        let updated = store.add_user("ABC123", "bob").await.unwrap().unwrap();
        assert_eq!(updated.users, vec!["alice", "bob"]);

        let err = store.add_user("ABC123", "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(_)));
        let stored = store.find_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(stored.users, vec!["alice", "bob"]);

        assert!(store.add_user("NOPE00", "bob").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_lose_nobody() {
        let store = Arc::new(store());
        store.create(session("ABC123")).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.add_user("ABC123", &format!("user{i}")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let stored = store.find_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(stored.users.len(), 51);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_joins_admit_one() {
        let store = Arc::new(store());
        store.create(session("ABC123")).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_user("ABC123", "bob").await })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(Some(_)) => admitted += 1,
                Err(StoreError::UsernameTaken(_)) => {}
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(admitted, 1);
        let stored = store.find_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(stored.users, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn remove_last_user_closes_session() {
        let store = store();
        store.create(session("ABC123")).await.unwrap();
        store.add_user("ABC123", "bob").await.unwrap();

        assert_eq!(
            store.remove_user("ABC123", "alice").await.unwrap(),
            RosterChange::Remaining(vec!["bob".into()])
        );
        // Removing an absent name is a no-op.
        assert_eq!(
            store.remove_user("ABC123", "alice").await.unwrap(),
            RosterChange::Remaining(vec!["bob".into()])
        );
        assert_eq!(
            store.remove_user("ABC123", "bob").await.unwrap(),
            RosterChange::Closed
        );
        assert!(store.find_by_code("ABC123").await.unwrap().is_none());
        assert_eq!(
            store.remove_user("ABC123", "bob").await.unwrap(),
            RosterChange::Missing
        );
    }

    #[tokio::test]
    async fn ideas_keep_arrival_order_and_unique_todo_ids() {
        let store = store();
        store.create(session("ABC123")).await.unwrap();

        store.push_idea("ABC123", Idea::new("alice", "first")).await.unwrap();
        store.push_idea("ABC123", Idea::todo("bob", "second", "t1")).await.unwrap();
        let err = store
            .push_idea("ABC123", Idea::todo("bob", "dup", "t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdeaId(id) if id == "t1"));

        let stored = store.find_by_code("ABC123").await.unwrap().unwrap();
        let texts: Vec<_> = stored.ideas.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(store.push_idea("NOPE00", Idea::new("a", "x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn toggle_todo_flips_and_ignores_non_todos() {
        let store = store();
        store.create(session("ABC123")).await.unwrap();
        store.push_idea("ABC123", Idea::todo("bob", "Draft budget", "t1")).await.unwrap();
        let mut plain = Idea::new("bob", "not a todo");
        plain.id = Some("p1".into());
        store.push_idea("ABC123", plain).await.unwrap();

        let once = store.toggle_todo("ABC123", "t1").await.unwrap().unwrap();
        assert_eq!(once.completed, Some(true));
        let twice = store.toggle_todo("ABC123", "t1").await.unwrap().unwrap();
        assert_eq!(twice.completed, Some(false));

        assert!(store.toggle_todo("ABC123", "p1").await.unwrap().is_none());
        assert!(store.toggle_todo("ABC123", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_hidden_then_purged() {
        let store = store();
        let mut old = session("OLD000");
        old.created_at = Utc::now() - TimeDelta::hours(25);
        store.sessions.insert(old.code.clone(), old);
        store.create(session("NEW000")).await.unwrap();

        assert!(store.find_by_code("OLD000").await.unwrap().is_none());
        assert!(store.add_user("OLD000", "bob").await.unwrap().is_none());
        assert_eq!(store.count_all().await.unwrap(), 1);

        let purged = store.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(purged, vec!["OLD000".to_string()]);
        assert_eq!(store.sessions.len(), 1);
    }

    #[tokio::test]
    async fn expired_code_can_be_reused() {
        let store = store();
        let mut old = session("ABC123");
        old.created_at = Utc::now() - TimeDelta::hours(25);
        store.sessions.insert(old.code.clone(), old);

        let fresh = store.create(session("ABC123")).await.unwrap();
        assert_eq!(store.find_by_code("ABC123").await.unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let store = store();
        for (i, code) in ["AAA000", "BBB000", "CCC000"].iter().enumerate() {
            let mut s = session(code);
            s.created_at = Utc::now() - TimeDelta::minutes(10 - i as i64);
            store.create(s).await.unwrap();
        }
        let recent = store.list_recent(2).await.unwrap();
        let codes: Vec<_> = recent.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["CCC000", "BBB000"]);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.first().map(|s| s.code.as_str()), Some("AAA000"));
    }

    #[tokio::test]
    async fn save_overwrites_mutable_fields_only() {
        let store = store();
        let created = store.create(session("ABC123")).await.unwrap();

        let mut edited = created.clone();
        edited.topic = "Q4 planning".into();
        edited.host = "someone-else".into();
        edited.users.push("bob".into());
        assert!(store.save(&edited).await.unwrap());

        let stored = store.find_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(stored.topic, "Q4 planning");
        assert_eq!(stored.users, vec!["alice", "bob"]);
        assert_eq!(stored.host, "conn-1");

        assert!(store.delete("ABC123").await.unwrap());
        assert!(!store.save(&edited).await.unwrap());
        assert!(!store.delete("ABC123").await.unwrap());
    }
}
