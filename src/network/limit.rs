//! Rate limiting for flood protection.
//!
//! Implements a token bucket algorithm for rate limiting inbound frames.

use std::time::Instant;

/// Token bucket rate limiter.
///
/// Uses a token bucket algorithm where:
/// - Tokens are added at a fixed rate per second
/// - Each frame costs 1 token
/// - If no tokens are available, the frame is rejected
pub struct RateLimiter {
    tokens: f32,
    last_check: Instant,
    rate: f32,
    capacity: f32,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `rate` - Tokens added per second
    /// * `capacity` - Maximum token capacity (burst size)
    pub fn new(rate: f32, capacity: f32) -> Self {
        Self {
            tokens: capacity,
            last_check: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Check if a frame can be processed.
    ///
    /// Returns `true` if the frame is allowed (token consumed),
    /// `false` if the rate limit is exceeded.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_check).as_secs_f32();
        self.last_check = now;

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Counts consecutive over-limit frames for one connection.
pub struct FloodGuard {
    limiter: RateLimiter,
    violations: u8,
    max_violations: u8,
}

/// What to do with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodVerdict {
    Allow,
    /// Drop the frame and warn the client.
    Reject { violations: u8 },
    /// Too many consecutive violations; close the connection.
    Disconnect,
}

impl FloodGuard {
    pub fn new(limiter: RateLimiter, max_violations: u8) -> Self {
        Self {
            limiter,
            violations: 0,
            max_violations,
        }
    }

    pub fn check(&mut self) -> FloodVerdict {
        if self.limiter.check() {
            self.violations = 0;
            return FloodVerdict::Allow;
        }
        self.violations = self.violations.saturating_add(1);
        if self.violations >= self.max_violations {
            FloodVerdict::Disconnect
        } else {
            FloodVerdict::Reject {
                violations: self.violations,
            }
        }
    }
}
