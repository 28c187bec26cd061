//! The login flow: classify the identity, mint the credential pair.

use tollgate_core::{
    envelope::encode,
    session::issue,
    types::{EntitlementClass, UnixMillis},
};

use crate::{
    cookie,
    gate::EntitlementGate,
    lookup::{Classification, EntitlementLookup},
};

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The lookup collaborator failed. The login fails cleanly: no
    /// credential is issued and no entitlement class is assumed.
    #[error("entitlement lookup unavailable: {0}")]
    LookupUnavailable(String),

    #[error("credential encoding failed: {0}")]
    Encode(#[from] tollgate_core::errors::Error),
}

/// What the login route should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Entitled: set these cookies and send the client to the resource.
    Granted {
        cookies: Vec<String>,
        redirect_to: String,
    },
    /// Not entitled: back to the entry point, nothing issued.
    Refused { redirect_to: String },
}

/// Runs one login attempt.
///
/// Consults the lookup exactly once, then issues per the classification:
/// free gets a session cookie, paid gets the session plus a counter cookie
/// (carrying forward a still-valid one presented by the client), and `none`
/// is refused without issuing anything.
pub async fn login<L: EntitlementLookup>(
    gate: &EntitlementGate,
    lookup: &L,
    email: &str,
    existing_counter: Option<&str>,
    secure: bool,
    now: UnixMillis,
) -> Result<LoginOutcome, LoginError> {
    let classification = lookup
        .classify(email)
        .await
        .map_err(|err| LoginError::LookupUnavailable(err.to_string()))?;

    #[cfg(feature = "tracing")]
    tracing::debug!("Login classified: email='{email}', classification={classification:?}");

    let class = match classification {
        Classification::Free => EntitlementClass::Free,
        Classification::Paid => EntitlementClass::Paid,
        Classification::None => {
            return Ok(LoginOutcome::Refused {
                redirect_to: gate.entry_path.clone(),
            });
        }
    };

    let issued = issue(email, class, existing_counter, &gate.key, &gate.policy, now)?;

    let session_token = encode(&issued.session, &gate.key)?;
    let mut cookies = vec![cookie::set_cookie(
        cookie::SESSION_COOKIE,
        &session_token,
        issued.session.expires_at.secs_remaining(now),
        secure,
    )];

    if let Some(counter) = issued.counter {
        let counter_token = encode(&counter, &gate.key)?;
        cookies.push(cookie::set_cookie(
            cookie::COUNTER_COOKIE,
            &counter_token,
            counter.expires_at.secs_remaining(now),
            secure,
        ));
    }

    Ok(LoginOutcome::Granted {
        cookies,
        redirect_to: gate.resource_path.clone(),
    })
}
