//! Profile update with optional avatar upload.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::csrf::{self, CSRF_FORM_FIELD};
use crate::auth::{CSRF_COOKIE_NAME, RequireSubject, SessionManager, get_cookie};
use crate::avatar::{self, AvatarError};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::validation;

/// Largest accepted avatar file.
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct ProfileState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    pub static_dir: Arc<PathBuf>,
}

impl_has_auth_backend!(ProfileState);

pub fn router(state: ProfileState) -> Router {
    Router::new()
        .route("/update-profile", post(update_profile))
        // Avatar plus text fields and multipart overhead
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024))
        .with_state(state)
}

/// Fields of the multipart form. A blank username, email or CSRF token
/// counts as absent.
#[derive(Default)]
struct ProfileForm {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    csrf_token: Option<String>,
    avatar: Option<Vec<u8>>,
}

fn multipart_err(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::too_large("Upload too large")
    } else {
        tracing::debug!("Rejected multipart body: {}", e.body_text());
        ApiError::bad_request("Invalid multipart data")
    }
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ProfileForm, ApiError> {
    let mut form = ProfileForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "avatar" => {
                // Browsers send an empty part when no file was chosen.
                if field.file_name().is_none_or(str::is_empty) {
                    continue;
                }
                let data = field.bytes().await.map_err(multipart_err)?;
                if data.len() > MAX_AVATAR_BYTES {
                    return Err(ApiError::too_large("Avatar too large (max 5MB)"));
                }
                form.avatar = Some(data.to_vec());
            }
            "full_name" | "bio" => {
                // Taken as sent; an empty bio clears the stored one.
                let text = Some(field.text().await.map_err(multipart_err)?);
                if name == "full_name" {
                    form.full_name = text;
                } else {
                    form.bio = text;
                }
            }
            "username" | "email" | CSRF_FORM_FIELD => {
                let text = non_blank(field.text().await.map_err(multipart_err)?);
                match name.as_str() {
                    "username" => form.username = text,
                    "email" => form.email = text,
                    _ => form.csrf_token = text,
                }
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

async fn update_profile(
    State(state): State<ProfileState>,
    RequireSubject(subject): RequireSubject,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;

    let supplied = csrf::header_token(&headers).or(form.csrf_token.as_deref());
    csrf::check(get_cookie(&headers, CSRF_COOKIE_NAME), supplied).inspect_err(|e| {
        tracing::warn!(subject = %subject, "CSRF check failed on profile update: {}", e)
    })?;

    let users = state.db.users();
    let user_id = subject.user_id()?;
    let mut user = users
        .get_by_id(user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(username) = form.username {
        if username != user.username {
            validation::validate_username(&username).map_err(ApiError::bad_request)?;
            if users
                .username_taken(&username, Some(user.id))
                .await
                .db_err("Failed to check username")?
            {
                return Err(ApiError::bad_request("Username already taken"));
            }
            user.username = username;
        }
    }

    if let Some(email) = form.email {
        if user.email.as_deref() != Some(email.as_str()) {
            validation::validate_email(&email).map_err(ApiError::bad_request)?;
            if users
                .email_taken(&email, Some(user.id))
                .await
                .db_err("Failed to check email")?
            {
                return Err(ApiError::bad_request("Email already in use"));
            }
            user.email = Some(email);
        }
    }

    if let Some(full_name) = form.full_name {
        user.full_name = full_name;
    }

    if let Some(bio) = form.bio {
        user.bio = Some(validation::truncate_bio(&bio));
    }

    if let Some(upload) = form.avatar {
        let webp = tokio::task::spawn_blocking(move || avatar::process_avatar(&upload))
            .await
            .internal_err("Avatar processing task failed")?
            .map_err(|e| match e {
                AvatarError::InvalidImage | AvatarError::UnsupportedFormat(_) => {
                    ApiError::bad_request(e.to_string())
                }
                AvatarError::Encode(e) => ApiError::internal("Failed to encode avatar", e),
            })?;

        let path = avatar::save_avatar(&state.static_dir, user.id, &webp)
            .await
            .internal_err("Failed to write avatar")?;
        tracing::debug!(user_id = user.id, path = %path.display(), "Avatar saved");
        user.avatar_url = Some(avatar::avatar_url(user.id));
    }

    let saved = users
        .save_profile(&user)
        .await
        .db_err("Failed to update profile")?;
    if !saved {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(serde_json::json!({ "message": "Profile update success" })))
}
