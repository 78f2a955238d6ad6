//! Session code allocation.

use crate::error::HandlerError;
use crate::store::{Session, SessionStore, StoreError};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stormer_proto::{CODE_ALPHABET, CODE_LEN};
use tracing::debug;

/// Draws random six-character codes and checks them against the store.
///
/// Collisions are rare (36^6 codes) but real: every candidate is checked, and
/// a racing creator that grabs the same code between check and insert is
/// caught by the store's `DuplicateCode` and counted as another collision.
pub struct CodeGenerator {
    rng: Mutex<StdRng>,
    max_attempts: usize,
}

impl CodeGenerator {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            max_attempts,
        }
    }

    /// Deterministic generator for tests.
    #[cfg(test)]
    pub fn with_seed(seed: u64, max_attempts: usize) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_attempts,
        }
    }

    /// A random code, not checked for collisions.
    pub fn candidate(&self) -> String {
        let mut rng = self.rng.lock();
        (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// A code no live session currently uses.
    pub async fn generate(&self, store: &dyn SessionStore) -> Result<String, HandlerError> {
        for attempt in 1..=self.max_attempts {
            let code = self.candidate();
            if store.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
            debug!(attempt, code = %code, "Session code collision");
        }
        Err(HandlerError::CodeSpaceExhausted(self.max_attempts))
    }

    /// Allocate a code and insert the session `build` makes for it.
    ///
    /// Lookup collisions and insert races share one attempt budget.
    pub async fn create_session<F>(
        &self,
        store: &dyn SessionStore,
        build: F,
    ) -> Result<Session, HandlerError>
    where
        F: Fn(String) -> Session + Send + Sync,
    {
        for attempt in 1..=self.max_attempts {
            let code = self.candidate();
            if store.find_by_code(&code).await?.is_some() {
                debug!(attempt, code = %code, "Session code collision");
                continue;
            }
            match store.create(build(code)).await {
                Ok(session) => return Ok(session),
                Err(StoreError::DuplicateCode(code)) => {
                    debug!(attempt, code = %code, "Session code taken by concurrent create");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(HandlerError::CodeSpaceExhausted(self.max_attempts))
    }
}
