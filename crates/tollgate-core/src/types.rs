use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, the wire form of every expiry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    /// Current wall-clock time. Everything below the HTTP layer takes `now`
    /// as an explicit parameter instead of calling this.
    pub fn now() -> Self {
        UnixMillis(chrono::Utc::now().timestamp_millis())
    }

    pub fn plus_secs(self, secs: u64) -> Self {
        UnixMillis(self.0.saturating_add((secs as i64).saturating_mul(1000)))
    }

    /// True once the deadline has been reached at `now`. A deadline equal to
    /// `now` already counts as expired.
    pub fn expired_at(self, now: UnixMillis) -> bool {
        self.0 <= now.0
    }

    /// Whole seconds left until the deadline, clamped at zero. Feeds cookie
    /// `Max-Age` attributes.
    pub fn secs_remaining(self, now: UnixMillis) -> i64 {
        ((self.0 - now.0) / 1000).max(0)
    }
}

impl Display for UnixMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access tier carried inside a session credential.
///
/// The set is closed at issuance: only `Free` and `Paid` are ever signed.
/// `Unknown` absorbs any unrecognized wire value on decode so the gate can
/// branch to denial exhaustively instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementClass {
    Free,
    Paid,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_equal_to_now_is_expired() {
        let now = UnixMillis(1_000);
        assert!(UnixMillis(1_000).expired_at(now));
        assert!(UnixMillis(999).expired_at(now));
        assert!(!UnixMillis(1_001).expired_at(now));
    }

    #[test]
    fn secs_remaining_clamps_at_zero() {
        let now = UnixMillis(10_000);
        assert_eq!(UnixMillis(13_500).secs_remaining(now), 3);
        assert_eq!(UnixMillis(2_000).secs_remaining(now), 0);
    }

    #[test]
    fn unrecognized_class_decodes_to_unknown() {
        let class: EntitlementClass = serde_json::from_str("\"trial\"").unwrap();
        assert_eq!(class, EntitlementClass::Unknown);

        let class: EntitlementClass = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(class, EntitlementClass::Paid);
    }
}
