//! SQLite session store.
//!
//! Roster and ideas live in child tables so that joins and idea submissions
//! are single conditional `INSERT ... SELECT` statements; SQLite serializes
//! writers, which makes each primitive atomic without a load-mutate-save.

use super::{RosterChange, Session, SessionStore, StoreError, retention_delta};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use stormer_proto::{Idea, Template};
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    retention: TimeDelta,
}

type SessionRow = (String, String, String, String, i64);

impl SqliteStore {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database and run migrations.
    pub async fn open(path: &str, retention: Duration) -> Result<Self, StoreError> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache database so parallel tests stay isolated.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:stormer-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .foreign_keys(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Self::ACQUIRE_TIMEOUT);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(path = %path, "Session database ready");

        Ok(Self {
            pool,
            retention: retention_delta(retention),
        })
    }

    /// Oldest `created_at` (unix millis) still considered live.
    fn cutoff_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.retention).timestamp_millis()
    }

    fn cutoff(&self) -> i64 {
        self.cutoff_at(Utc::now())
    }

    async fn load(
        conn: &mut SqliteConnection,
        code: &str,
        cutoff: i64,
    ) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT code, topic, template, host, created_at FROM sessions WHERE code = ? AND created_at > ?",
        )
        .bind(code)
        .bind(cutoff)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((code, topic, template, host, created_at)) = row else {
            return Ok(None);
        };

        let users: Vec<String> = sqlx::query_scalar(
            "SELECT username FROM session_users WHERE code = ? ORDER BY position",
        )
        .bind(&code)
        .fetch_all(&mut *conn)
        .await?;

        let payloads: Vec<String> =
            sqlx::query_scalar("SELECT payload FROM session_ideas WHERE code = ? ORDER BY seq")
                .bind(&code)
                .fetch_all(&mut *conn)
                .await?;
        let ideas = payloads
            .iter()
            .map(|p| serde_json::from_str::<Idea>(p))
            .collect::<Result<Vec<_>, _>>()?;

        let template = Template::from_str(&template)
            .map_err(|e| StoreError::Corrupt(format!("session {code}: {e}")))?;
        let created_at = DateTime::from_timestamp_millis(created_at)
            .ok_or_else(|| StoreError::Corrupt(format!("session {code}: bad created_at")))?;

        Ok(Some(Session {
            code,
            topic,
            template,
            users,
            ideas,
            host,
            created_at,
        }))
    }

    async fn load_many(
        conn: &mut SqliteConnection,
        codes: Vec<String>,
        cutoff: i64,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions = Vec::with_capacity(codes.len());
        for code in codes {
            if let Some(session) = Self::load(conn, &code, cutoff).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    async fn insert_children(
        conn: &mut SqliteConnection,
        session: &Session,
    ) -> Result<(), StoreError> {
        for (position, username) in session.users.iter().enumerate() {
            sqlx::query("INSERT INTO session_users (code, position, username) VALUES (?, ?, ?)")
                .bind(&session.code)
                .bind(position as i64)
                .bind(username)
                .execute(&mut *conn)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        StoreError::UsernameTaken(username.clone())
                    }
                    other => other.into(),
                })?;
        }
        for (seq, idea) in session.ideas.iter().enumerate() {
            sqlx::query(
                "INSERT INTO session_ideas (code, seq, todo_id, payload) VALUES (?, ?, ?, ?)",
            )
            .bind(&session.code)
            .bind(seq as i64)
            .bind(idea.todo_id())
            .bind(serde_json::to_string(idea)?)
            .execute(&mut *conn)
            .await
            .map_err(|e| duplicate_todo(e, idea))?;
        }
        Ok(())
    }
}

fn duplicate_todo(e: sqlx::Error, idea: &Idea) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateIdeaId(idea.todo_id().unwrap_or_default().to_string())
        }
        other => other.into(),
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        let cutoff = self.cutoff();
        let mut tx = self.pool.begin().await?;

        // An expired, unswept row must not block reuse of its code.
        sqlx::query("DELETE FROM sessions WHERE code = ? AND created_at <= ?")
            .bind(&session.code)
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO sessions (code, topic, template, host, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.code)
        .bind(&session.topic)
        .bind(session.template.as_str())
        .bind(&session.host)
        .bind(session.created_at.timestamp_millis())
        .execute(&mut *tx)
        .await;

        match inserted {
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::DuplicateCode(session.code));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        Self::insert_children(&mut tx, &session).await?;
        tx.commit().await?;
        Ok(session)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::load(&mut conn, code, self.cutoff()).await
    }

    async fn save(&self, session: &Session) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE sessions SET topic = ?, template = ? WHERE code = ? AND created_at > ?",
        )
        .bind(&session.topic)
        .bind(session.template.as_str())
        .bind(&session.code)
        .bind(self.cutoff())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM session_users WHERE code = ?")
            .bind(&session.code)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM session_ideas WHERE code = ?")
            .bind(&session.code)
            .execute(&mut *tx)
            .await?;
        Self::insert_children(&mut tx, session).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, code: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_all(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE created_at > ?")
            .bind(self.cutoff())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let cutoff = self.cutoff();
        let mut conn = self.pool.acquire().await?;
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT code FROM sessions WHERE created_at > ? ORDER BY created_at DESC, code LIMIT ?",
        )
        .bind(cutoff)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&mut *conn)
        .await?;
        Self::load_many(&mut conn, codes, cutoff).await
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        let cutoff = self.cutoff();
        let mut conn = self.pool.acquire().await?;
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT code FROM sessions WHERE created_at > ? ORDER BY created_at, code",
        )
        .bind(cutoff)
        .fetch_all(&mut *conn)
        .await?;
        Self::load_many(&mut conn, codes, cutoff).await
    }

    async fn add_user(&self, code: &str, username: &str) -> Result<Option<Session>, StoreError> {
        let cutoff = self.cutoff();
        let mut conn = self.pool.acquire().await?;
        let inserted = sqlx::query(
            "INSERT INTO session_users (code, position, username)
             SELECT ?1, COALESCE((SELECT MAX(position) FROM session_users WHERE code = ?1), -1) + 1, ?2
             WHERE EXISTS (SELECT 1 FROM sessions WHERE code = ?1 AND created_at > ?3)",
        )
        .bind(code)
        .bind(username)
        .bind(cutoff)
        .execute(&mut *conn)
        .await;

        match inserted {
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
            Ok(result) if result.rows_affected() == 0 => Ok(None),
            Ok(_) => Self::load(&mut conn, code, cutoff).await,
        }
    }

    async fn remove_user(&self, code: &str, username: &str) -> Result<RosterChange, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock for the rest.
        sqlx::query("DELETE FROM session_users WHERE code = ? AND username = ?")
            .bind(code)
            .bind(username)
            .execute(&mut *tx)
            .await?;

        let live: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM sessions WHERE code = ? AND created_at > ?")
                .bind(code)
                .bind(self.cutoff())
                .fetch_optional(&mut *tx)
                .await?;
        if live.is_none() {
            return Ok(RosterChange::Missing);
        }

        let users: Vec<String> = sqlx::query_scalar(
            "SELECT username FROM session_users WHERE code = ? ORDER BY position",
        )
        .bind(code)
        .fetch_all(&mut *tx)
        .await?;

        let change = if users.is_empty() {
            sqlx::query("DELETE FROM sessions WHERE code = ?")
                .bind(code)
                .execute(&mut *tx)
                .await?;
            RosterChange::Closed
        } else {
            RosterChange::Remaining(users)
        };
        tx.commit().await?;
        Ok(change)
    }

    async fn push_idea(&self, code: &str, mut idea: Idea) -> Result<Option<Idea>, StoreError> {
        idea.normalize();
        let payload = serde_json::to_string(&idea)?;
        let inserted = sqlx::query(
            "INSERT INTO session_ideas (code, seq, todo_id, payload)
             SELECT ?1, COALESCE((SELECT MAX(seq) FROM session_ideas WHERE code = ?1), -1) + 1, ?2, ?3
             WHERE EXISTS (SELECT 1 FROM sessions WHERE code = ?1 AND created_at > ?4)",
        )
        .bind(code)
        .bind(idea.todo_id())
        .bind(payload)
        .bind(self.cutoff())
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_todo(e, &idea))?;

        Ok((inserted.rows_affected() > 0).then_some(idea))
    }

    async fn toggle_todo(&self, code: &str, id: &str) -> Result<Option<Idea>, StoreError> {
        let payload: Option<String> = sqlx::query_scalar(
            "UPDATE session_ideas
             SET payload = json_set(payload, '$.completed',
                 CASE WHEN json_extract(payload, '$.completed') THEN json('false') ELSE json('true') END)
             WHERE code = ?1 AND todo_id = ?2
               AND EXISTS (SELECT 1 FROM sessions WHERE code = ?1 AND created_at > ?3)
             RETURNING payload",
        )
        .bind(code)
        .bind(id)
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(StoreError::from))
            .transpose()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let codes: Vec<String> =
            sqlx::query_scalar("DELETE FROM sessions WHERE created_at <= ? RETURNING code")
                .bind(self.cutoff_at(now))
                .fetch_all(&self.pool)
                .await?;
        Ok(codes)
    }
}
