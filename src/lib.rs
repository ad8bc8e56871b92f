pub mod api;
pub mod auth;
pub mod avatar;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;
pub mod validation;
pub mod web;

use axum::{
    Json, Router,
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use api::{ErrorResponse, INTERNAL_ERROR_MESSAGE, create_api_router};
use auth::{CookieSettings, SessionManager};
use db::Database;
use jwt::TokenCodec;
use rate_limit::{RateLimitConfig, RateLimitQuotas};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Root of the static directory; avatars live in `images/avatars` below it
    pub static_dir: PathBuf,
    /// Markdown file rendered as the home page
    pub home_page: PathBuf,
    /// Header carrying the client IP (requires running behind a proxy)
    pub ip_header: Option<HeaderName>,
    /// Per-IP budgets for login and signup
    pub rate_limits: RateLimitQuotas,
}

/// Convert a panic into the same opaque 500 every other internal error gets.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let codec = Arc::new(TokenCodec::new(&config.jwt_secret));
    let sessions = Arc::new(SessionManager::new(
        codec,
        CookieSettings {
            secure: config.secure_cookies,
        },
    ));

    let rate_limit_config = Arc::new(RateLimitConfig::new(
        config.rate_limits,
        config.ip_header.clone(),
    ));

    let api_router = create_api_router(
        config.db.clone(),
        sessions.clone(),
        rate_limit_config,
        Arc::new(config.static_dir.clone()),
    );

    let web_router = web::router(web::WebState {
        db: config.db.clone(),
        sessions,
        home_page: Arc::new(config.home_page.clone()),
    });

    let avatar_dir = config.static_dir.join(avatar::AVATAR_DIR);

    Router::new()
        .nest("/api/v1", api_router)
        .nest_service("/static/images/avatars", ServeDir::new(avatar_dir))
        .merge(web_router)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
