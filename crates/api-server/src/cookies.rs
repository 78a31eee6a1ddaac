//! Minimal cookie plumbing for the assignment endpoints.

use axum::http::HeaderMap;

/// Extract a cookie value by name from the request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for cookie in cookies.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Build a `Set-Cookie` value for an assignment token: site-wide scope,
/// HTTP-only, expiry enforced by `Max-Age`.
pub fn assignment_cookie(name: &str, token: &str, max_age_secs: u64) -> String {
    format!("{name}={token}; Max-Age={max_age_secs}; Path=/; HttpOnly")
}
