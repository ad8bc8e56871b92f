//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;

use axum::http::HeaderName;
use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::db::Database;
use crate::rate_limit::RateLimitQuotas;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Scribe", about = "Blog backend with cookie sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "SCRIBE_PORT")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "scribe.db", env = "SCRIBE_DATABASE")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Directory served under /static; avatars are written below it
    #[arg(long, default_value = "static", env = "SCRIBE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Markdown file rendered as the home page
    #[arg(long, default_value = "primary.md", env = "SCRIBE_HOME_PAGE")]
    pub home_page: PathBuf,

    /// Omit the Secure flag on cookies (local development over plain HTTP)
    #[arg(long, env = "SCRIBE_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Read the client IP from this header (e.g. x-forwarded-for) when behind a proxy
    #[arg(long, value_parser = parse_ip_header)]
    pub ip_header: Option<HeaderName>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_ip_header(s: &str) -> Result<HeaderName, String> {
    HeaderName::from_bytes(s.trim().to_ascii_lowercase().as_bytes())
        .map_err(|_| format!("Invalid header name: {}", s))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    if args.insecure_cookies {
        tracing::warn!("Cookies will be sent without the Secure flag");
    }

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies: !args.insecure_cookies,
        static_dir: args.static_dir.clone(),
        home_page: args.home_page.clone(),
        ip_header: args.ip_header.clone(),
        rate_limits: RateLimitQuotas::default(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["scribe"]).unwrap();
        assert_eq!(args.port, 5000);
        assert_eq!(args.database, "scribe.db");
        assert_eq!(args.static_dir, PathBuf::from("static"));
        assert_eq!(args.home_page, PathBuf::from("primary.md"));
        assert!(!args.insecure_cookies);
        assert!(args.ip_header.is_none());
    }

    #[test]
    fn test_ip_header_parsing() {
        let args = Args::try_parse_from(["scribe", "--ip-header", "X-Forwarded-For"]).unwrap();
        assert_eq!(args.ip_header.unwrap().as_str(), "x-forwarded-for");

        assert!(Args::try_parse_from(["scribe", "--ip-header", "bad header"]).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(validate_jwt_secret("too-short".to_string()).is_none());
        assert!(validate_jwt_secret("x".repeat(32)).is_some());
    }

    #[tokio::test]
    async fn test_build_config_secure_by_default() {
        let db = Database::open(":memory:").await.unwrap();
        let args = Args::try_parse_from(["scribe"]).unwrap();
        assert!(build_config(&args, db.clone(), "s".repeat(32)).secure_cookies);

        let args = Args::try_parse_from(["scribe", "--insecure-cookies"]).unwrap();
        assert!(!build_config(&args, db, "s".repeat(32)).secure_cookies);
    }
}
