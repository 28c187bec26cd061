//! The non-mutating status view.

use serde::Serialize;
use tollgate_core::{
    counter::CounterPayload,
    envelope::decode,
    session::SessionPayload,
    types::{EntitlementClass, UnixMillis},
};

use crate::{gate::EntitlementGate, lookup::Classification};

/// Client-facing status document, purely for display.
///
/// Free reports unlimited use (`remaining`/`limit` null); unauthenticated
/// reports carry no usage fields at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl StatusReport {
    /// The degraded report every internal failure collapses to.
    pub fn none() -> Self {
        StatusReport {
            status: Classification::None,
            used: None,
            remaining: None,
            limit: None,
        }
    }
}

/// Builds the status report from the two credential tokens.
///
/// Reads tokens, never rotates them, and never fails outward: any decode or
/// verification problem degrades to the unauthenticated report.
pub fn report(
    gate: &EntitlementGate,
    session_token: Option<&str>,
    counter_token: Option<&str>,
    now: UnixMillis,
) -> StatusReport {
    let Some(session) =
        session_token.and_then(|token| decode::<SessionPayload>(token, &gate.key))
    else {
        return StatusReport::none();
    };
    if session.ensure_active(now).is_err() {
        return StatusReport::none();
    }

    match session.class {
        EntitlementClass::Free => StatusReport {
            status: Classification::Free,
            used: Some(0),
            remaining: None,
            limit: None,
        },
        EntitlementClass::Paid => {
            let used = counter_token
                .and_then(|token| decode::<CounterPayload>(token, &gate.key))
                .filter(|counter| !counter.expires_at.expired_at(now))
                .map_or(0, |counter| counter.count);
            let limit = gate.policy.access_cap;

            StatusReport {
                status: Classification::Paid,
                used: Some(used),
                remaining: Some(limit.saturating_sub(used)),
                limit: Some(limit),
            }
        }
        EntitlementClass::Unknown => StatusReport::none(),
    }
}

#[cfg(test)]
mod tests {
    use tollgate_core::envelope::encode;

    use super::*;

    const NOW: UnixMillis = UnixMillis(1_700_000_000_000);

    fn gate() -> EntitlementGate {
        EntitlementGate::builder()
            .key("status_test_secret")
            .entry_path("/index.html")
            .resource_path("/report.html")
            .build()
    }

    fn session_token(gate: &EntitlementGate, class: EntitlementClass) -> String {
        let session = SessionPayload {
            email: "a@x.com".to_string(),
            class,
            expires_at: UnixMillis(NOW.0 + 60_000),
        };
        encode(&session, &gate.key).unwrap()
    }

    #[test]
    fn missing_or_invalid_session_reports_none() {
        let gate = gate();
        assert_eq!(report(&gate, None, None, NOW), StatusReport::none());
        assert_eq!(
            report(&gate, Some("junk"), None, NOW),
            StatusReport::none()
        );
    }

    #[test]
    fn free_session_reports_unlimited() {
        let gate = gate();
        let session = session_token(&gate, EntitlementClass::Free);
        let report = report(&gate, Some(&session), None, NOW);
        assert_eq!(report.status, Classification::Free);
        assert_eq!(report.used, Some(0));
        assert_eq!(report.remaining, None);
        assert_eq!(report.limit, None);
    }

    #[test]
    fn paid_session_reports_counter_state() {
        let gate = gate();
        let session = session_token(&gate, EntitlementClass::Paid);
        let counter = CounterPayload {
            email: "a@x.com".to_string(),
            count: 3,
            expires_at: UnixMillis(NOW.0 + 60_000),
        };
        let counter = encode(&counter, &gate.key).unwrap();

        let report = report(&gate, Some(&session), Some(&counter), NOW);
        assert_eq!(report.status, Classification::Paid);
        assert_eq!(report.used, Some(3));
        assert_eq!(report.remaining, Some(0));
        assert_eq!(report.limit, Some(3));
    }

    #[test]
    fn paid_without_counter_reports_full_allowance() {
        let gate = gate();
        let session = session_token(&gate, EntitlementClass::Paid);
        let report = report(&gate, Some(&session), None, NOW);
        assert_eq!(report.used, Some(0));
        assert_eq!(report.remaining, Some(3));
    }

    #[test]
    fn status_query_never_mutates_tokens() {
        // Two consecutive reads see the same counter value.
        let gate = gate();
        let session = session_token(&gate, EntitlementClass::Paid);
        let counter = CounterPayload {
            email: "a@x.com".to_string(),
            count: 1,
            expires_at: UnixMillis(NOW.0 + 60_000),
        };
        let counter = encode(&counter, &gate.key).unwrap();

        let first = report(&gate, Some(&session), Some(&counter), NOW);
        let second = report(&gate, Some(&session), Some(&counter), NOW);
        assert_eq!(first, second);
        assert_eq!(second.used, Some(1));
    }

    #[test]
    fn wire_shape_omits_usage_fields_when_unauthenticated() {
        let json = serde_json::to_string(&StatusReport::none()).unwrap();
        assert_eq!(json, r#"{"status":"none"}"#);
    }
}
