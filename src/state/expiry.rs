//! Session expiry background task.
//!
//! Reads already hide sessions past the retention window; this task deletes
//! them for good and tells anyone still connected.

use super::board::Board;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const EXPIRED_MESSAGE: &str = "This session has expired.";

/// Spawn the expiry sweeper.
pub fn spawn_expiry_task(board: Arc<Board>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            sweep(&board, Utc::now()).await;
        }
    });
}

/// Purge every session expired at `now`. Returns the removed codes.
pub async fn sweep(board: &Board, now: DateTime<Utc>) -> Vec<String> {
    let expired = match board.store.purge_expired(now).await {
        Ok(codes) => codes,
        Err(e) => {
            warn!(error = %e, "Expiry sweep failed");
            return Vec::new();
        }
    };

    for code in &expired {
        board.end_session(code, EXPIRED_MESSAGE);
        crate::metrics::record_expired();
    }
    if !expired.is_empty() {
        info!(
            removed = expired.len(),
            open_rooms = board.hub.room_count(),
            "Expired sessions removed"
        );
    }
    expired
}
