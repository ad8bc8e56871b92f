//! Authentication user types.

use super::errors::AuthError;

/// The authenticated user as carried in a token's `sub` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(String);

impl Subject {
    pub fn new(sub: impl Into<String>) -> Self {
        Self(sub.into())
    }

    pub fn for_user(user_id: i64) -> Self {
        Self(user_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Database id of the subject. Every token we sign carries a numeric id,
    /// so anything else is treated as an invalid token.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.0.parse().map_err(|_| AuthError::InvalidToken)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of an optional subject lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visitor {
    Authenticated(Subject),
    Anonymous,
}

impl Visitor {
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            Visitor::Authenticated(subject) => Some(subject),
            Visitor::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Visitor::Authenticated(_))
    }
}
