//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::TokenError;

/// Failures raised by the session, CSRF and subject-lookup layers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid token type")]
    WrongTokenType,
    #[error("CSRF token missing")]
    CsrfMissing,
    #[error("Invalid CSRF token")]
    CsrfMismatch,
    /// Token signing failed; detail is logged, never returned.
    #[error("Internal Server Error")]
    Internal,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated | AuthError::InvalidToken | AuthError::WrongTokenType => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::CsrfMissing | AuthError::CsrfMismatch => StatusCode::FORBIDDEN,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken => AuthError::InvalidToken,
            TokenError::WrongTokenType => AuthError::WrongTokenType,
            TokenError::Encoding(e) => {
                tracing::error!(error = %e, "Failed to sign token");
                AuthError::Internal
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::WrongTokenType.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::CsrfMissing.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::CsrfMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_errors_map_unchanged() {
        assert!(matches!(
            AuthError::from(TokenError::InvalidToken),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from(TokenError::WrongTokenType),
            AuthError::WrongTokenType
        ));
    }
}
