//! The request-time entitlement gate.
//!
//! Re-evaluated independently on every request with no cross-request server
//! memory: every piece of state round-trips through the client-held cookies,
//! so concurrent requests share nothing and the gate needs no locking. The
//! accepted consequence is that two concurrent requests from one client can
//! observe the same pre-increment counter and both be granted; the client's
//! cookie store resolves the two rotated copies as last-write-wins.

use bon::Builder;
use bytes::Bytes;
use http::{Request, Response, StatusCode, header};
use http_body_util::Full;
use tollgate_core::{
    counter::{CounterPayload, consume},
    envelope::{SigningKey, decode, encode},
    policy::Policy,
    session::SessionPayload,
    types::{EntitlementClass, UnixMillis},
};

use crate::cookie;

/// Per-request derived state. Never persisted; exists only to name the
/// branch the gate took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoSession,
    SessionExpiredOrInvalid,
    FreeActive,
    PaidActive,
    PaidExhausted,
    UnknownClass,
}

/// Entitlement snapshot attached to granted requests via request extensions,
/// for handlers that want to know who got through.
#[derive(Debug, Clone)]
pub struct GrantState {
    pub email: String,
    pub class: EntitlementClass,
    /// Count after this access, paid class only.
    pub used: Option<u32>,
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone)]
pub enum Decision {
    Allow {
        grant: GrantState,
        /// Advanced counter to re-sign into the response, paid class only.
        /// This is the single branch that mutates anything.
        rotated: Option<CounterPayload>,
    },
    Deny(GateState),
}

impl Decision {
    /// The derived per-request state behind this decision.
    pub fn state(&self) -> GateState {
        match self {
            Decision::Allow { grant, .. } => match grant.class {
                EntitlementClass::Free => GateState::FreeActive,
                EntitlementClass::Paid => GateState::PaidActive,
                EntitlementClass::Unknown => GateState::UnknownClass,
            },
            Decision::Deny(state) => *state,
        }
    }
}

/// Uniform denial: a redirect to the entry point, identical for every
/// failure cause. Expired, tampered and exhausted are indistinguishable to
/// the client.
#[derive(Debug, Clone)]
pub struct DenyRedirect {
    pub state: GateState,
    pub location: String,
}

impl From<DenyRedirect> for Response<Full<Bytes>> {
    fn from(value: DenyRedirect) -> Self {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::FOUND;
        if let Ok(location) = header::HeaderValue::from_str(&value.location) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for DenyRedirect {
    fn into_response(self) -> axum::response::Response {
        axum::response::Redirect::to(&self.location).into_response()
    }
}

/// The paywall decision point for one protected resource.
#[derive(Builder, Debug, Clone)]
pub struct EntitlementGate {
    /// Shared HMAC key verifying and re-signing every credential.
    #[builder(into)]
    pub key: SigningKey,

    /// Cap and window policy.
    #[builder(default)]
    pub policy: Policy,

    /// Redirect target for every denial, the unauthenticated entry point.
    #[builder(into)]
    pub entry_path: String,

    /// The protected resource; successful logins land here.
    #[builder(into)]
    pub resource_path: String,
}

impl EntitlementGate {
    /// Classifies one request from its two credential tokens.
    ///
    /// Pure over its inputs. Absent, malformed, mis-signed and expired
    /// sessions all deny; a free session allows with no counter involved; a
    /// paid session consults the counter, self-healing an absent or expired
    /// one to a fresh zero-count window rather than locking a legitimate
    /// paid user out.
    pub fn evaluate(
        &self,
        session_token: Option<&str>,
        counter_token: Option<&str>,
        now: UnixMillis,
    ) -> Decision {
        let Some(session_token) = session_token else {
            return Decision::Deny(GateState::NoSession);
        };
        let Some(session) = decode::<SessionPayload>(session_token, &self.key) else {
            return Decision::Deny(GateState::SessionExpiredOrInvalid);
        };
        if session.ensure_active(now).is_err() {
            return Decision::Deny(GateState::SessionExpiredOrInvalid);
        }

        match session.class {
            EntitlementClass::Free => Decision::Allow {
                grant: GrantState {
                    email: session.email,
                    class: EntitlementClass::Free,
                    used: None,
                },
                rotated: None,
            },
            EntitlementClass::Paid => {
                let counter = counter_token
                    .and_then(|token| decode::<CounterPayload>(token, &self.key))
                    .filter(|counter| !counter.expires_at.expired_at(now))
                    .unwrap_or_else(|| {
                        CounterPayload::fresh(
                            session.email.clone(),
                            self.policy.counter_window_secs,
                            now,
                        )
                    });

                let Ok(advanced) = consume(&counter, self.policy.access_cap) else {
                    return Decision::Deny(GateState::PaidExhausted);
                };

                Decision::Allow {
                    grant: GrantState {
                        email: session.email,
                        class: EntitlementClass::Paid,
                        used: Some(advanced.count),
                    },
                    rotated: Some(advanced),
                }
            }
            EntitlementClass::Unknown => Decision::Deny(GateState::UnknownClass),
        }
    }

    /// Gates one request.
    ///
    /// On a grant, attaches the [`GrantState`] to the request extensions,
    /// runs the handler, and for the paid class appends the re-signed,
    /// advanced counter cookie to the response so the client's stored copy
    /// moves forward. Every denial becomes the same redirect.
    pub async fn handle_request<Fun, Fut, Req, Res>(
        &self,
        mut request: Request<Req>,
        handler: Fun,
    ) -> Result<Response<Res>, DenyRedirect>
    where
        Fun: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = Response<Res>>,
    {
        let now = UnixMillis::now();
        let session_token = cookie::request_cookie(&request, cookie::SESSION_COOKIE);
        let counter_token = cookie::request_cookie(&request, cookie::COUNTER_COOKIE);
        let secure = !cookie::is_loopback_request(&request);

        let decision = self.evaluate(session_token.as_deref(), counter_token.as_deref(), now);

        #[cfg(feature = "tracing")]
        tracing::debug!("Gate decision: state={:?}", decision.state());

        match decision {
            Decision::Deny(state) => Err(self.deny(state)),
            Decision::Allow { grant, rotated } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Access granted: email='{}', used={:?}",
                    grant.email,
                    grant.used
                );

                request.extensions_mut().insert(grant);
                let mut response = handler(request).await;

                if let Some(counter) = rotated
                    && let Some(set_cookie) = self.counter_set_cookie(&counter, now, secure)
                {
                    response
                        .headers_mut()
                        .append(header::SET_COOKIE, set_cookie);
                }

                Ok(response)
            }
        }
    }

    /// The denial response for a given state.
    pub fn deny(&self, state: GateState) -> DenyRedirect {
        DenyRedirect {
            state,
            location: self.entry_path.clone(),
        }
    }

    /// Renders the advanced counter into a `Set-Cookie` header value.
    ///
    /// Returns `None` when the cookie cannot be encoded; the grant already
    /// happened, so the access goes uncounted rather than failing the
    /// request.
    fn counter_set_cookie(
        &self,
        counter: &CounterPayload,
        now: UnixMillis,
        secure: bool,
    ) -> Option<header::HeaderValue> {
        let token = match encode(counter, &self.key) {
            Ok(token) => token,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to encode counter cookie: {_err}; skipping");
                return None;
            }
        };
        let line = cookie::set_cookie(
            cookie::COUNTER_COOKIE,
            &token,
            counter.expires_at.secs_remaining(now),
            secure,
        );
        header::HeaderValue::from_str(&line).ok()
    }
}
