mod error;
mod posts;
mod profile;
mod session;
mod users;

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, INTERNAL_ERROR_MESSAGE, ResultExt};
pub(crate) use error::ErrorResponse;

/// Create the API router, mounted under `/api/v1`.
pub fn create_api_router(
    db: Database,
    sessions: Arc<SessionManager>,
    rate_limit_config: Arc<RateLimitConfig>,
    static_dir: Arc<PathBuf>,
) -> Router {
    let users_state = users::UsersState {
        db: db.clone(),
        sessions: sessions.clone(),
        rate_limit_config: rate_limit_config.clone(),
    };

    let session_state = session::SessionState {
        db: db.clone(),
        sessions: sessions.clone(),
        rate_limit_config,
    };

    let profile_state = profile::ProfileState {
        db: db.clone(),
        sessions: sessions.clone(),
        static_dir,
    };

    let posts_state = posts::PostsState { db, sessions };

    Router::new()
        .merge(users::router(users_state))
        .merge(profile::router(profile_state))
        .merge(posts::router(posts_state))
        .nest("/auth", session::router(session_state))
}
