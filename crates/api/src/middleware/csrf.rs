//! Double-submit anti-forgery tokens.
//!
//! Form endpoints set the `agora_csrf` cookie and echo its value in the view
//! model; state-changing requests must send the same value in `X-CSRF-Token`.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use crate::error::error_response;
use agora_shared::AppError;

/// Cookie carrying the anti-forgery token.
pub const CSRF_COOKIE: &str = "agora_csrf";

/// Header that must echo the cookie value.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Reuse the caller's token or mint a new one, returning the jar to send back.
#[must_use]
pub fn issue_token(jar: CookieJar) -> (CookieJar, String) {
    if let Some(token) = jar.get(CSRF_COOKIE).map(|c| c.value().to_string())
        && !token.is_empty()
    {
        return (jar, token);
    }

    let token = Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/");

    (jar.add(cookie), token)
}

/// Whether the header echoes a non-empty cookie token.
fn token_matches(jar: &CookieJar, headers: &HeaderMap) -> bool {
    let Some(cookie) = jar.get(CSRF_COOKIE) else {
        return false;
    };
    let Some(header) = headers.get(CSRF_HEADER).and_then(|h| h.to_str().ok()) else {
        return false;
    };

    !cookie.value().is_empty() && cookie.value() == header
}

/// Rejects unsafe requests whose anti-forgery header does not match the cookie.
pub async fn csrf_middleware(jar: CookieJar, request: Request, next: Next) -> Response {
    if request.method().is_safe() || token_matches(&jar, request.headers()) {
        return next.run(request).await;
    }

    debug!(method = %request.method(), uri = %request.uri(), "Anti-forgery check failed");
    error_response(&AppError::Forbidden(
        "Anti-forgery token missing or invalid".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_token_sets_cookie() {
        let (jar, token) = issue_token(CookieJar::new());

        assert_eq!(token.len(), 32);
        let cookie = jar.get(CSRF_COOKIE).expect("cookie set");
        assert_eq!(cookie.value(), token);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn test_issue_token_reuses_existing() {
        let jar = CookieJar::new().add(Cookie::new(CSRF_COOKIE, "existing"));

        let (_, token) = issue_token(jar);

        assert_eq!(token, "existing");
    }

    #[test]
    fn test_token_matches() {
        let jar = CookieJar::new().add(Cookie::new(CSRF_COOKIE, "abc"));
        let mut headers = HeaderMap::new();
        assert!(!token_matches(&jar, &headers));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("xyz"));
        assert!(!token_matches(&jar, &headers));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("abc"));
        assert!(token_matches(&jar, &headers));

        assert!(!token_matches(&CookieJar::new(), &headers));
    }
}
