//! Double-submit CSRF protection.
//!
//! The `csrf_token` cookie is readable by client script, which echoes it back
//! in the `X-CSRF-Token` header. A cross-site request carries the cookie but
//! cannot read it, so the two values only agree for same-site callers.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;

use super::cookie::{CSRF_COOKIE_NAME, get_cookie};
use super::errors::AuthError;

/// Header carrying the echoed CSRF token.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Form field accepted in place of the header on multipart endpoints.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

const CSRF_TOKEN_BYTES: usize = 32;

/// Generate a random URL-safe token with 32 bytes of entropy.
pub fn generate_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the cookie value against the value supplied with the request.
pub fn check(cookie: Option<&str>, supplied: Option<&str>) -> Result<(), AuthError> {
    let (Some(cookie), Some(supplied)) = (
        cookie.filter(|c| !c.is_empty()),
        supplied.filter(|s| !s.is_empty()),
    ) else {
        return Err(AuthError::CsrfMissing);
    };

    if bool::from(cookie.as_bytes().ct_eq(supplied.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::CsrfMismatch)
    }
}

/// Value of the `X-CSRF-Token` header, if present and valid UTF-8.
pub fn header_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers.get(CSRF_HEADER_NAME)?.to_str().ok()
}

/// Extractor guarding state-mutating endpoints with the header variant.
pub struct CsrfProtected;

impl<S> FromRequestParts<S> for CsrfProtected
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        check(
            get_cookie(&parts.headers, CSRF_COOKIE_NAME),
            header_token(&parts.headers),
        )
        .inspect_err(|e| tracing::warn!(path = %parts.uri.path(), "CSRF check failed: {}", e))?;
        Ok(CsrfProtected)
    }
}
