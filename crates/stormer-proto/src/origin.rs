//! WebSocket origin policy.
//!
//! Browsers always send `Origin` on WebSocket upgrades, so a gateway can
//! refuse cross-site pages it does not trust. An empty allow list accepts
//! every origin.

use std::fmt;

/// Origin rules applied to WebSocket upgrade requests.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    /// Exact origins allowed to connect (empty = all).
    pub allowed_origins: Vec<String>,
    /// Reject upgrades that carry no `Origin` header at all.
    pub require_origin: bool,
}

/// Why an upgrade was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRejection {
    /// `require_origin` is set and the header was absent.
    Missing,
    /// The origin is not on the allow list.
    NotAllowed(String),
}

impl fmt::Display for OriginRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginRejection::Missing => write!(f, "Origin header required"),
            OriginRejection::NotAllowed(origin) => write!(f, "Origin '{}' not allowed", origin),
        }
    }
}

impl std::error::Error for OriginRejection {}

impl OriginPolicy {
    /// Build a policy from an allow list.
    pub fn new(allowed_origins: Vec<String>, require_origin: bool) -> Self {
        Self {
            allowed_origins,
            require_origin,
        }
    }

    /// Check the `Origin` header value of an upgrade request.
    pub fn check(&self, origin: Option<&str>) -> Result<(), OriginRejection> {
        let Some(origin) = origin else {
            return if self.require_origin {
                Err(OriginRejection::Missing)
            } else {
                Ok(())
            };
        };

        if self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.trim_end_matches('/') == origin.trim_end_matches('/'))
        {
            Ok(())
        } else {
            Err(OriginRejection::NotAllowed(origin.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_accepts_any_origin() {
        let policy = OriginPolicy::default();
        assert_eq!(policy.check(Some("https://example.com")), Ok(()));
        assert_eq!(policy.check(None), Ok(()));
    }

    #[test]
    fn whitelist_allows_listed_origin() {
        let policy = OriginPolicy::new(vec!["https://board.example.com".into()], true);
        assert_eq!(policy.check(Some("https://board.example.com")), Ok(()));
        assert_eq!(policy.check(Some("https://board.example.com/")), Ok(()));
    }

    #[test]
    fn whitelist_rejects_other_origin() {
        let policy = OriginPolicy::new(vec!["https://allowed.com".into()], false);
        let err = policy.check(Some("https://evil.com")).unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn missing_origin_when_required() {
        let policy = OriginPolicy::new(Vec::new(), true);
        assert_eq!(policy.check(None), Err(OriginRejection::Missing));
    }
}
