//! Cookie plumbing over raw `http` headers.
//!
//! Both credentials travel as cookies with the same attribute policy:
//! path-scoped, HttpOnly, SameSite=Lax, and Secure everywhere except
//! loopback hosts so local development keeps working.

use http::{HeaderMap, Request, header};

/// Session credential cookie name.
pub const SESSION_COOKIE: &str = "tg_session";
/// Counter credential cookie name, present only for the paid class.
pub const COUNTER_COOKIE: &str = "tg_access";

/// Extracts a named cookie value from a `Cookie` header line.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Reads a named cookie from request headers, tolerating multiple `Cookie`
/// header lines.
pub fn header_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get_all(header::COOKIE).iter().find_map(|value| {
        let line = value.to_str().ok()?;
        cookie_value(line, name).map(str::to_string)
    })
}

pub fn request_cookie<B>(request: &Request<B>, name: &str) -> Option<String> {
    header_cookie(request.headers(), name)
}

/// Renders a `Set-Cookie` line carrying a credential.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Loopback hosts are exempt from the `Secure` attribute.
pub fn is_loopback_host(host: &str) -> bool {
    let host = if let Some(end) = host.strip_prefix('[').and_then(|h| h.split(']').next()) {
        end
    } else {
        host.rsplit_once(':').map_or(host, |(name, _)| name)
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Whether a request arrived on a loopback host, per its `Host` header.
/// An absent or unreadable header counts as non-loopback, so cookies default
/// to Secure.
pub fn is_loopback_request<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_loopback_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let line = "theme=dark; tg_session=abc.def; other=1";
        assert_eq!(cookie_value(line, SESSION_COOKIE), Some("abc.def"));
        assert_eq!(cookie_value(line, COUNTER_COOKIE), None);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let line = "xtg_session=evil; tg_session=good";
        assert_eq!(cookie_value(line, SESSION_COOKIE), Some("good"));
    }

    #[test]
    fn renders_attribute_policy() {
        let cookie = set_cookie(SESSION_COOKIE, "v", 3600, true);
        assert_eq!(
            cookie,
            "tg_session=v; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );

        let local = set_cookie(SESSION_COOKIE, "v", 3600, false);
        assert!(!local.contains("Secure"));
    }

    #[test]
    fn negative_max_age_clamps_to_zero() {
        let cookie = set_cookie(COUNTER_COOKIE, "v", -5, false);
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn loopback_hosts() {
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("localhost:3000"));
        assert!(is_loopback_host("127.0.0.1:8080"));
        assert!(is_loopback_host("[::1]:8080"));
        assert!(!is_loopback_host("example.com"));
        assert!(!is_loopback_host("localhost.example.com"));
    }
}
