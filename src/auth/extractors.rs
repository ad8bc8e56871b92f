//! Axum extractors for the authenticated subject.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::{Subject, Visitor};
use crate::jwt::{TokenCodec, TokenType};

/// Resolve the subject from the access cookie.
/// Codec failures are surfaced unchanged.
pub fn lookup_subject(headers: &HeaderMap, codec: &TokenCodec) -> Result<Subject, AuthError> {
    let token = get_cookie(headers, ACCESS_COOKIE_NAME).ok_or(AuthError::Unauthenticated)?;
    let claims = codec.verify(token, TokenType::Access)?;
    Ok(Subject::new(claims.sub))
}

/// Rejects the request unless a valid access token is present.
pub struct RequireSubject(pub Subject);

impl<S> FromRequestParts<S> for RequireSubject
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        lookup_subject(&parts.headers, state.sessions().codec())
            .map(RequireSubject)
            .inspect_err(|e| tracing::debug!(path = %parts.uri.path(), "auth rejected: {}", e))
    }
}

/// Never rejects; maps a failed lookup to [`Visitor::Anonymous`].
pub struct OptionalSubject(pub Visitor);

impl<S> FromRequestParts<S> for OptionalSubject
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let visitor = match lookup_subject(&parts.headers, state.sessions().codec()) {
            Ok(subject) => Visitor::Authenticated(subject),
            Err(_) => Visitor::Anonymous,
        };
        Ok(OptionalSubject(visitor))
    }
}
