//! Paid-class access counting.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    types::UnixMillis,
};

/// Per-window access counter carried by paid sessions.
///
/// Wire form matches the cookie payload: `{"email":..,"n":..,"exp":..}`.
/// The counter and the session are independent signed artifacts correlated
/// only by email; the counter keeps its own, longer expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterPayload {
    pub email: String,
    #[serde(rename = "n")]
    pub count: u32,
    #[serde(rename = "exp")]
    pub expires_at: UnixMillis,
}

impl CounterPayload {
    /// A fresh counter at zero with a full window ahead of it.
    pub fn fresh(email: impl Into<String>, window_secs: u64, now: UnixMillis) -> Self {
        CounterPayload {
            email: email.into(),
            count: 0,
            expires_at: now.plus_secs(window_secs),
        }
    }
}

/// Outcome of a consumption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consume {
    pub allowed: bool,
    /// Advanced by one when allowed, untouched otherwise.
    pub updated: CounterPayload,
}

/// Pure cap check over an explicit payload: no I/O, no ambient state.
///
/// Keeping this a pure input/output function confines the accepted
/// same-client concurrency race to last-write-wins between two client-held
/// copies; there is no server-side counter to race on.
pub fn try_consume(counter: &CounterPayload, cap: u32) -> Consume {
    if counter.count < cap {
        let mut updated = counter.clone();
        updated.count += 1;
        Consume {
            allowed: true,
            updated,
        }
    } else {
        Consume {
            allowed: false,
            updated: counter.clone(),
        }
    }
}

/// [`try_consume`] for callers that want the denial as an error value:
/// returns the advanced payload or [`Error::CapExhausted`].
pub fn consume(counter: &CounterPayload, cap: u32) -> Result<CounterPayload> {
    let attempt = try_consume(counter, cap);
    if attempt.allowed {
        Ok(attempt.updated)
    } else {
        Err(Error::CapExhausted)
    }
}
