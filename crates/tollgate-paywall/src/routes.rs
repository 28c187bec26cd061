//! Login and status routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tollgate_core::types::UnixMillis;

use crate::{
    cookie::{self, COUNTER_COOKIE, SESSION_COOKIE},
    gate::EntitlementGate,
    login::{LoginOutcome, login},
    lookup::EntitlementLookup,
    status::{StatusReport, report},
};

/// Shared state for the credential routes.
#[derive(Debug, Clone)]
pub struct GateContext<L> {
    pub gate: EntitlementGate,
    pub lookup: L,
}

/// Builds the `/login` and `/status` routes around a gate and its lookup.
/// The protected resource itself is gated separately by layering the
/// [`EntitlementGate`] onto its routes.
pub fn router<L>(context: GateContext<L>) -> Router
where
    L: EntitlementLookup + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/login", get(login_handler::<L>))
        .route("/status", get(status_handler::<L>))
        .with_state(context)
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    email: Option<String>,
}

async fn login_handler<L>(
    State(context): State<GateContext<L>>,
    Query(params): Query<LoginParams>,
    headers: HeaderMap,
) -> Response
where
    L: EntitlementLookup + Clone + Send + Sync + 'static,
{
    let Some(email) = params
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return (StatusCode::BAD_REQUEST, "Missing email").into_response();
    };

    let existing_counter = cookie::header_cookie(&headers, COUNTER_COOKIE);
    let secure = !headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(cookie::is_loopback_host);

    match login(
        &context.gate,
        &context.lookup,
        email,
        existing_counter.as_deref(),
        secure,
        UnixMillis::now(),
    )
    .await
    {
        Ok(LoginOutcome::Granted {
            cookies,
            redirect_to,
        }) => {
            let mut response = Redirect::to(&redirect_to).into_response();
            for line in cookies {
                if let Ok(value) = header::HeaderValue::from_str(&line) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            response
        }
        Ok(LoginOutcome::Refused { redirect_to }) => Redirect::to(&redirect_to).into_response(),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Login failed: {_err}");

            (StatusCode::BAD_GATEWAY, "Entitlement check failed").into_response()
        }
    }
}

async fn status_handler<L>(
    State(context): State<GateContext<L>>,
    headers: HeaderMap,
) -> Json<StatusReport>
where
    L: EntitlementLookup + Clone + Send + Sync + 'static,
{
    let session = cookie::header_cookie(&headers, SESSION_COOKIE);
    let counter = cookie::header_cookie(&headers, COUNTER_COOKIE);
    Json(report(
        &context.gate,
        session.as_deref(),
        counter.as_deref(),
        UnixMillis::now(),
    ))
}
