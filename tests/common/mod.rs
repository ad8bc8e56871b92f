#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, header},
};
use scribe::{ServerConfig, create_app, db::Database, rate_limit::RateLimitQuotas};
use std::net::SocketAddr;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

/// Quotas no test will hit unless it means to.
pub fn generous_quotas() -> RateLimitQuotas {
    RateLimitQuotas {
        login_per_second: 1000,
        login_burst: 1000,
        signup_per_minute: 1000,
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub static_dir: TempDir,
}

/// Cookies and CSRF token of a logged in user.
pub struct Session {
    pub user_id: i64,
    pub cookie: String,
    pub csrf: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_quotas(generous_quotas()).await
    }

    pub async fn with_quotas(rate_limits: RateLimitQuotas) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let static_dir = tempfile::tempdir().expect("Failed to create static dir");
        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: b"test-jwt-secret-at-least-32-bytes!".to_vec(),
            secure_cookies: false,
            static_dir: static_dir.path().to_path_buf(),
            home_page: static_dir.path().join("primary.md"),
            ip_header: None,
            rate_limits,
        };
        Self {
            app: create_app(&config),
            db,
            static_dir,
        }
    }

    /// Send a request as if it arrived from 127.0.0.1.
    pub async fn send(&self, mut request: Request<Body>) -> Response<Body> {
        if request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .is_none()
        {
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        }
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> Response<Body> {
        self.send(json_request("POST", uri, &json, None)).await
    }

    /// Create a user with a password and return its id.
    pub async fn create_user(&self, username: &str) -> i64 {
        let response = self
            .post_json(
                "/api/v1/create-user",
                serde_json::json!({
                    "username": username,
                    "full_name": format!("{} Example", username),
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "create-user failed");
        body_json(response).await["id"].as_i64().unwrap()
    }

    pub async fn login(&self, login: &str) -> Session {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({ "login": login, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), 200, "login failed");

        let set_cookies = extract_set_cookies(&response);
        let pairs: Vec<String> = set_cookies
            .iter()
            .map(|c| c.split(';').next().unwrap().to_string())
            .collect();
        let csrf = cookie_value(&set_cookies, "csrf_token").unwrap();
        let user_id = body_json(response).await["id"].as_i64().unwrap();

        Session {
            user_id,
            cookie: pairs.join("; "),
            csrf,
        }
    }

    /// Create a user and log in as them.
    pub async fn signed_in(&self, username: &str) -> Session {
        self.create_user(username).await;
        self.login(username).await
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    json: &serde_json::Value,
    session: Option<(&Session, bool)>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((session, with_csrf)) = session {
        builder = builder.header(header::COOKIE, &session.cookie);
        if with_csrf {
            builder = builder.header("x-csrf-token", &session.csrf);
        }
    }
    builder.body(Body::from(json.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the named cookie among `Set-Cookie` headers.
pub fn cookie_value(set_cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies.iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&prefix))
            .map(|v| v.to_string())
    })
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

const BOUNDARY: &str = "scribe-test-boundary";

/// Build a multipart/form-data request.
pub fn multipart_request(
    uri: &str,
    parts: &[Part<'_>],
    cookie: Option<&str>,
    csrf_header: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(csrf) = csrf_header {
        builder = builder.header("x-csrf-token", csrf);
    }
    builder.body(Body::from(body)).unwrap()
}
