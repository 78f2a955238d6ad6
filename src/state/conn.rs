//! Connection identifiers.
//!
//! Host authority is "whoever holds the connection id recorded at creation",
//! so ids must never repeat within a process. A monotonically increasing
//! counter guarantees that; the random prefix keeps ids from different
//! process lifetimes apart in logs.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of one live transport connection.
pub type ConnId = String;

pub struct ConnIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl ConnIdGenerator {
    pub fn new() -> Self {
        let prefix = base36_encode(rand::thread_rng().gen_range(0..36u64.pow(3)), 3);
        Self::with_prefix(prefix)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next unique connection id.
    pub fn next(&self) -> ConnId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, base36_encode(n, 6))
    }
}

impl Default for ConnIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode `n` as a fixed-width base36 string (wider if `n` needs it).
fn base36_encode(mut n: u64, width: usize) -> String {
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::with_capacity(width);
    while n > 0 || digits.len() < width {
        digits.push(CHARS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
