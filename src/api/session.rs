//! Session endpoints.
//!
//! - POST `/auth/login` - Verify credentials and issue session cookies
//! - POST `/auth/refresh` - Exchange the refresh cookie for a new access cookie
//! - POST `/auth/logout` - Clear all session cookies

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiJson, ResultExt};
use super::users::UserCreatedResponse;
use crate::auth::{
    SessionManager, Subject,
    password::{verify_dummy, verify_password},
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(SessionState);

pub fn router(state: SessionState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    /// Username or email.
    login: String,
    password: String,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

async fn login(
    State(state): State<SessionState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_login(payload.login.trim())
        .await
        .db_err("Failed to look up user")?;

    // Accounts created with only an email have no password to check.
    let hash = user.as_ref().and_then(|u| u.password_hash.clone());
    let password = payload.password;
    let valid = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            verify_dummy(&password);
            Ok(false)
        }
    })
    .await
    .internal_err("Password verification task failed")?
    .internal_err("Stored password hash is unreadable")?;

    let user = match user {
        Some(user) if valid => user,
        user => {
            tracing::info!(user_id = user.map(|u| u.id), "Failed login attempt");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let cookies = state.sessions.issue(&Subject::for_user(user.id))?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::OK,
        cookies,
        Json(UserCreatedResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

/// The refresh token itself is neither rotated nor revoked.
async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let (subject, access_cookie) = state.sessions.refresh(&headers)?;

    // Tokens outlive deleted accounts.
    state
        .db
        .users()
        .get_by_id(subject.user_id()?)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, access_cookie)],
        Json(serde_json::json!({ "success": true })),
    ))
}

async fn logout(State(state): State<SessionState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        state.sessions.clear(),
        Json(serde_json::json!({ "success": true })),
    )
}
