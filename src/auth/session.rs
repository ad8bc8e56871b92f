//! Issuing, refreshing and clearing the three session cookies.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, header::SET_COOKIE};
use axum::response::{IntoResponseParts, ResponseParts};

use super::cookie::{
    ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, get_cookie,
};
use super::csrf;
use super::errors::AuthError;
use super::types::Subject;
use crate::jwt::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL, TokenCodec, TokenType};

/// `Set-Cookie` values for the access, refresh and CSRF cookies.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    pub access: String,
    pub refresh: String,
    pub csrf: String,
}

impl SessionCookies {
    pub fn headers(self) -> [(HeaderName, String); 3] {
        [
            (SET_COOKIE, self.access),
            (SET_COOKIE, self.refresh),
            (SET_COOKIE, self.csrf),
        ]
    }
}

impl IntoResponseParts for SessionCookies {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for (name, value) in self.headers() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                res.headers_mut().append(name, value);
            }
        }
        Ok(res)
    }
}

/// Mints session cookies from the shared token codec.
pub struct SessionManager {
    codec: Arc<TokenCodec>,
    cookies: CookieSettings,
}

impl SessionManager {
    pub fn new(codec: Arc<TokenCodec>, cookies: CookieSettings) -> Self {
        Self { codec, cookies }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn access_cookie(&self, subject: &Subject) -> Result<String, AuthError> {
        let token = self
            .codec
            .create(subject.as_str(), TokenType::Access, ACCESS_TOKEN_TTL)?;
        Ok(self
            .cookies
            .http_only(ACCESS_COOKIE_NAME, &token, ACCESS_TOKEN_TTL.as_secs()))
    }

    /// Start a session: new access and refresh tokens plus a fresh CSRF token.
    pub fn issue(&self, subject: &Subject) -> Result<SessionCookies, AuthError> {
        let refresh_token =
            self.codec
                .create(subject.as_str(), TokenType::Refresh, REFRESH_TOKEN_TTL)?;

        Ok(SessionCookies {
            access: self.access_cookie(subject)?,
            refresh: self.cookies.http_only(
                REFRESH_COOKIE_NAME,
                &refresh_token,
                REFRESH_TOKEN_TTL.as_secs(),
            ),
            csrf: self
                .cookies
                .readable(CSRF_COOKIE_NAME, &csrf::generate_token()),
        })
    }

    /// Deletion instructions for all three cookies.
    pub fn clear(&self) -> SessionCookies {
        SessionCookies {
            access: self.cookies.expired(ACCESS_COOKIE_NAME),
            refresh: self.cookies.expired(REFRESH_COOKIE_NAME),
            csrf: self.cookies.expired(CSRF_COOKIE_NAME),
        }
    }

    /// Exchange the refresh cookie for a new access cookie.
    /// The refresh and CSRF cookies are left as they are.
    pub fn refresh(&self, headers: &HeaderMap) -> Result<(Subject, String), AuthError> {
        let refresh_token =
            get_cookie(headers, REFRESH_COOKIE_NAME).ok_or(AuthError::Unauthenticated)?;

        let claims = self.codec.verify(refresh_token, TokenType::Refresh)?;
        let subject = Subject::new(claims.sub);
        let cookie = self.access_cookie(&subject)?;
        Ok((subject, cookie))
    }
}
