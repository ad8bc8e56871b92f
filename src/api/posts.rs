//! Blog posts, comments, categories and tags.
//!
//! Reads are public and only ever see published posts. Writes require a
//! session and a matching CSRF header.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::error::{ApiError, ApiJson, ResultExt};
use crate::auth::{CsrfProtected, RequireSubject, SessionManager, Subject};
use crate::db::{Category, Comment, Database, NewPost, Post, PostStatus, Tag};
use crate::impl_has_auth_backend;
use crate::validation::{self, COMMENT_MAX_LEN, TITLE_MAX_LEN, generate_slug};

#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
}

impl_has_auth_backend!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{slug}", get(get_post))
        .route(
            "/posts/{slug}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/categories", get(list_categories))
        .route("/tags", get(list_tags))
        .with_state(state)
}

// --- Response types ---

#[derive(Serialize)]
struct AuthorResponse {
    id: i64,
    username: String,
    full_name: String,
}

#[derive(Serialize)]
struct PostResponse {
    id: i64,
    title: String,
    slug: String,
    content: String,
    status: PostStatus,
    author: AuthorResponse,
    category: Option<Category>,
    tags: Vec<Tag>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            status: post.status,
            author: AuthorResponse {
                id: post.author_id,
                username: post.author_username,
                full_name: post.author_full_name,
            },
            category: post.category,
            tags: post.tags,
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize)]
struct CommentResponse {
    id: i64,
    author_id: i64,
    author_username: String,
    content: String,
    created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            author_id: comment.author_id,
            author_username: comment.author_username,
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}

// --- Request types ---

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    #[serde(default)]
    content: String,
    slug: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    /// Drafts unless set.
    #[serde(default)]
    publish: bool,
}

#[derive(Deserialize)]
struct CreateCommentRequest {
    content: String,
}

// --- Handlers ---

async fn list_posts(State(state): State<PostsState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .db
        .posts()
        .list_published()
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(
        posts
            .into_iter()
            .map(PostResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn find_published(state: &PostsState, slug: &str) -> Result<Post, ApiError> {
    state
        .db
        .posts()
        .get_published_by_slug(slug)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

async fn get_post(
    State(state): State<PostsState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find_published(&state, &slug).await?;
    Ok(Json(PostResponse::from(post)))
}

/// Id of the signed-in author. A token can outlive its account.
async fn current_author(state: &PostsState, subject: &Subject) -> Result<i64, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(subject.user_id()?)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(user.id)
}

/// Name and slug for a category or tag, or an error naming the kind.
fn label(name: &str, kind: &str) -> Result<(String, String), ApiError> {
    let name = name.trim();
    let slug = generate_slug(name);
    if slug.is_empty() {
        return Err(ApiError::bad_request(format!("Invalid {} name", kind)));
    }
    Ok((name.to_string(), slug))
}

async fn create_post(
    State(state): State<PostsState>,
    RequireSubject(subject): RequireSubject,
    _csrf: CsrfProtected,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = current_author(&state, &subject).await?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ApiError::bad_request(
            "Title cannot be longer than 200 characters",
        ));
    }

    let slug = match payload.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => {
            validation::validate_slug(slug).map_err(ApiError::bad_request)?;
            slug.to_string()
        }
        None => {
            let slug = generate_slug(title);
            if slug.is_empty() {
                return Err(ApiError::bad_request(
                    "Could not derive a slug from the title",
                ));
            }
            slug
        }
    };

    let posts = state.db.posts();
    if posts
        .slug_exists(&slug)
        .await
        .db_err("Failed to check slug")?
    {
        return Err(ApiError::bad_request("Slug already in use"));
    }

    let category = match payload.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(name) => Some(label(name, "category")?),
        None => None,
    };

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for name in payload.tags.iter().filter(|t| !t.trim().is_empty()) {
        let tag = label(name, "tag")?;
        if seen.insert(tag.1.clone()) {
            tags.push(tag);
        }
    }

    let status = if payload.publish {
        PostStatus::Published
    } else {
        PostStatus::Draft
    };

    let id = posts
        .create(&NewPost {
            title: title.to_string(),
            slug,
            content: payload.content,
            author_id,
            category,
            tags,
            status,
        })
        .await
        .db_err("Failed to create post")?;

    let post = posts
        .get_by_id(id)
        .await
        .db_err("Failed to load created post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    tracing::info!(post_id = id, slug = %post.slug, author_id, "Post created");

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

async fn list_comments(
    State(state): State<PostsState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find_published(&state, &slug).await?;
    let comments = state
        .db
        .comments()
        .list_for_post(post.id)
        .await
        .db_err("Failed to list comments")?;

    Ok(Json(
        comments
            .into_iter()
            .map(CommentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn create_comment(
    State(state): State<PostsState>,
    RequireSubject(subject): RequireSubject,
    _csrf: CsrfProtected,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = current_author(&state, &subject).await?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment cannot be empty"));
    }
    if content.chars().count() > COMMENT_MAX_LEN {
        return Err(ApiError::bad_request(
            "Comment cannot be longer than 2000 characters",
        ));
    }

    let post = find_published(&state, &slug).await?;
    let comments = state.db.comments();
    let id = comments
        .create(post.id, author_id, content)
        .await
        .db_err("Failed to create comment")?;

    let comment = comments
        .get_by_id(id)
        .await
        .db_err("Failed to load created comment")?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

async fn list_categories(State(state): State<PostsState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .db
        .categories()
        .list()
        .await
        .db_err("Failed to list categories")?;
    Ok(Json(categories))
}

async fn list_tags(State(state): State<PostsState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state
        .db
        .tags()
        .list()
        .await
        .db_err("Failed to list tags")?;
    Ok(Json(tags))
}
