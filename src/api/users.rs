use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ApiJson, ResultExt};
use crate::auth::{RequireSubject, SessionManager, password::hash_password};
use crate::db::{Database, NewUser, User};
use crate::impl_has_auth_backend;
use crate::rate_limit::{RateLimitConfig, rate_limit_user_create};
use crate::validation;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let create_router = Router::new()
        .route("/create-user", post(create_user))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_user_create,
        ));

    Router::new()
        .route("/me", get(me))
        .with_state(state)
        .merge(create_router)
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    bio: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct UserCreatedResponse {
    pub id: i64,
    pub username: String,
}

/// Public view of a user account.
#[derive(Serialize)]
struct ProfileResponse {
    id: i64,
    username: String,
    email: Option<String>,
    full_name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Trimmed value, or None when absent or blank.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn create_user(
    State(state): State<UsersState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(full_name)) =
        (non_blank(&payload.username), non_blank(&payload.full_name))
    else {
        return Err(ApiError::bad_request(
            "Missing mandatory fields - username and full_name",
        ));
    };

    let email = non_blank(&payload.email);
    let password = payload.password.as_deref().filter(|p| !p.is_empty());
    if email.is_none() && password.is_none() {
        return Err(ApiError::bad_request(
            "Either email or password must be provided",
        ));
    }

    validation::validate_username(username).map_err(ApiError::bad_request)?;
    if let Some(email) = email {
        validation::validate_email(email).map_err(ApiError::bad_request)?;
    }
    if let Some(password) = password {
        validation::validate_password(password).map_err(ApiError::bad_request)?;
    }
    let bio = non_blank(&payload.bio);
    if let Some(bio) = bio {
        validation::validate_bio(bio).map_err(ApiError::bad_request)?;
    }

    let users = state.db.users();
    if users
        .username_taken(username, None)
        .await
        .db_err("Failed to check username")?
    {
        return Err(ApiError::bad_request("Username already taken"));
    }
    if let Some(email) = email {
        if users
            .email_taken(email, None)
            .await
            .db_err("Failed to check email")?
        {
            return Err(ApiError::bad_request("Email already in use"));
        }
    }

    let password_hash = match password {
        Some(password) => {
            let password = password.to_string();
            let hash = tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .internal_err("Password hashing task failed")?
                .internal_err("Failed to hash password")?;
            Some(hash)
        }
        None => None,
    };

    let id = users
        .create(&NewUser {
            username,
            email,
            password_hash: password_hash.as_deref(),
            full_name,
            bio,
        })
        .await
        .db_err("Failed to create user")?;

    tracing::info!(user_id = id, username = %username, "User created");

    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            id,
            username: username.to_string(),
        }),
    ))
}

async fn me(
    State(state): State<UsersState>,
    RequireSubject(subject): RequireSubject,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(subject.user_id()?)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
