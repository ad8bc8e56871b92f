//! Session cookie names, parsing and `Set-Cookie` formatting.

use axum::http::header;

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Cookie name for the double-submit CSRF token (readable by scripts).
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Flags shared by every session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Adds the `Secure` attribute. Only disable for plain-HTTP development.
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl CookieSettings {
    fn suffix(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }

    /// HTTP-only cookie with an explicit lifetime.
    pub fn http_only(&self, name: &str, value: &str, max_age_secs: u64) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
            name,
            value,
            max_age_secs,
            self.suffix()
        )
    }

    /// Script-readable, session-scoped cookie.
    pub fn readable(&self, name: &str, value: &str) -> String {
        format!("{}={}; SameSite=Lax; Path=/{}", name, value, self.suffix())
    }

    /// Deletion instruction for `name`.
    pub fn expired(&self, name: &str) -> String {
        format!("{}=; SameSite=Lax; Path=/; Max-Age=0{}", name, self.suffix())
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            if let Some((key, value)) = part.trim().split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}
