//! Rate limiting for login and signup.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down brute force
//! and signup spam.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
};

use crate::api::ErrorResponse;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Request budgets per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitQuotas {
    /// Sustained login attempts per second.
    pub login_per_second: u32,
    /// Login attempts allowed in a burst.
    pub login_burst: u32,
    /// Signups per minute.
    pub signup_per_minute: u32,
}

impl Default for RateLimitQuotas {
    fn default() -> Self {
        Self {
            login_per_second: 1,
            login_burst: 5,
            signup_per_minute: 3,
        }
    }
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

/// Rate limiters shared by the rate limited routes.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub user_create: Arc<IpLimiter>,
    /// Take the client IP from this header instead of the socket address.
    pub ip_header: Option<HeaderName>,
}

impl RateLimitConfig {
    pub fn new(quotas: RateLimitQuotas, ip_header: Option<HeaderName>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(non_zero(quotas.login_per_second))
                    .allow_burst(non_zero(quotas.login_burst)),
            )),
            user_create: Arc::new(RateLimiter::keyed(Quota::per_minute(non_zero(
                quotas.signup_per_minute,
            )))),
            ip_header,
        }
    }
}

/// Extract the client IP.
///
/// With a configured header the first comma separated entry must parse as an
/// IP address; there is no fallback to the socket address.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    ip_header: Option<&HeaderName>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(name) => {
            let value = headers
                .get(name)
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            let first = value.split(',').next().unwrap_or("").trim();
            first
                .parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| "IP header is not an IP address")
        }
        None => connect_info
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}

fn rejection(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

async fn check(
    limiter: &IpLimiter,
    ip_header: Option<&HeaderName>,
    request: Request,
    next: Next,
    message: &str,
) -> Response {
    let ip = match extract_client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        ip_header,
    ) {
        Ok(ip) => ip,
        Err(reason) => {
            tracing::warn!(reason, "Rejecting request without client IP");
            return rejection(StatusCode::FORBIDDEN, "Unable to determine client IP.");
        }
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::info!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            rejection(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.login,
        config.ip_header.as_ref(),
        request,
        next,
        "Too many authentication attempts. Please wait before trying again.",
    )
    .await
}

/// Middleware for rate limiting user creation.
pub async fn rate_limit_user_create(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.user_create,
        config.ip_header.as_ref(),
        request,
        next,
        "Too many signup attempts. Please wait before trying again.",
    )
    .await
}
