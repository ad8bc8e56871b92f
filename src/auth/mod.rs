//! Cookie-based JWT sessions with double-submit CSRF protection.
//!
//! A session is three cookies: a short-lived access token (15 min), a
//! long-lived refresh token (7 days) and a script-readable CSRF token.
//! Access tokens are stateless; refresh tokens are neither stored nor rotated.

mod cookie;
pub mod csrf;
mod errors;
mod extractors;
pub mod password;
mod session;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, get_cookie,
};
pub use csrf::CsrfProtected;
pub use errors::AuthError;
pub use extractors::{OptionalSubject, RequireSubject, lookup_subject};
pub use session::{SessionCookies, SessionManager};
pub use state::HasAuthBackend;
pub use types::{Subject, Visitor};
