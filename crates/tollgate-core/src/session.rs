//! Session issuance.

use serde::{Deserialize, Serialize};

use crate::{
    counter::CounterPayload,
    envelope::{SigningKey, decode},
    errors::{Error, Result},
    policy::Policy,
    types::{EntitlementClass, UnixMillis},
};

/// Authentication credential payload.
///
/// Wire field names match the cookie format: `{"email":..,"status":..,"exp":..}`.
/// Immutable once issued; a new login replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub email: String,
    #[serde(rename = "status")]
    pub class: EntitlementClass,
    #[serde(rename = "exp")]
    pub expires_at: UnixMillis,
}

impl SessionPayload {
    /// Errors with [`Error::Expired`] once the session window has closed.
    /// A window closing exactly at `now` already counts as closed.
    pub fn ensure_active(&self, now: UnixMillis) -> Result<()> {
        if self.expires_at.expired_at(now) {
            Err(Error::Expired)
        } else {
            Ok(())
        }
    }
}

/// Credential pair minted by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub session: SessionPayload,
    /// Present only for the paid class.
    pub counter: Option<CounterPayload>,
}

/// Issues the credential pair for an already-classified identity.
///
/// The session is always fresh. For paid identities the previously held
/// counter envelope, when it still verifies and has not expired, is carried
/// forward untouched: logging in again must never reset a paid user's
/// remaining balance. Anything else starts a new counter window at zero.
///
/// Refuses issuance for [`EntitlementClass::Unknown`]; the caller sends the
/// client back to the unauthenticated entry point.
pub fn issue(
    email: &str,
    class: EntitlementClass,
    existing_counter: Option<&str>,
    key: &SigningKey,
    policy: &Policy,
    now: UnixMillis,
) -> Result<IssuedCredentials> {
    if class == EntitlementClass::Unknown {
        return Err(Error::UnknownClass);
    }

    let email = normalize_email(email);
    let session = SessionPayload {
        email: email.clone(),
        class,
        expires_at: now.plus_secs(policy.session_window_secs),
    };

    let counter = match class {
        EntitlementClass::Paid => Some(carry_or_mint(&email, existing_counter, key, policy, now)),
        _ => None,
    };

    Ok(IssuedCredentials { session, counter })
}

fn carry_or_mint(
    email: &str,
    existing: Option<&str>,
    key: &SigningKey,
    policy: &Policy,
    now: UnixMillis,
) -> CounterPayload {
    if let Some(token) = existing
        && let Some(counter) = decode::<CounterPayload>(token, key)
        && !counter.expires_at.expired_at(now)
    {
        return counter;
    }
    CounterPayload::fresh(email, policy.counter_window_secs, now)
}

/// Lowercase + trim, applied at every identity entry point so the session,
/// counter and lookup store all agree on the same key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
