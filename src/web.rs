//! Server-rendered pages: the markdown home page, the blog index and the
//! login form.

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
};
use pulldown_cmark::{Options, Parser, html};
use std::fmt::Write;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiError, ResultExt};
use crate::auth::{OptionalSubject, SessionManager, Visitor};
use crate::db::{Database, Post};
use crate::impl_has_auth_backend;

/// Characters of post content shown on the index.
const EXCERPT_LEN: usize = 280;

#[derive(Clone)]
pub struct WebState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
    /// Markdown file rendered at `/`.
    pub home_page: Arc<PathBuf>,
}

impl_has_auth_backend!(WebState);

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/blog", get(blog_index))
        .route("/login", get(login_page))
        .with_state(state)
}

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    ))
}

/// Strip the indentation shared by all non-blank lines.
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render markdown to HTML with table support. Fenced code is CommonMark.
pub fn render_markdown(text: &str) -> String {
    let text = dedent(text);
    let parser = Parser::new_ext(&text, Options::ENABLE_TABLES);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

const HOME_FALLBACK: &str = "<main>\n<h1>Scribe</h1>\n<p><a href=\"/blog\">Read the blog</a></p>\n</main>\n";

async fn home(State(state): State<WebState>) -> Result<Html<String>, ApiError> {
    let body = match tokio::fs::read_to_string(state.home_page.as_path()).await {
        Ok(text) => format!("<main>\n{}</main>\n", render_markdown(&text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %state.home_page.display(), "Home page file missing");
            HOME_FALLBACK.to_string()
        }
        Err(e) => return Err(ApiError::internal("Failed to read home page", e)),
    };
    Ok(page("Home", &body))
}

fn excerpt(content: &str) -> String {
    let mut text: String = content.chars().take(EXCERPT_LEN).collect();
    if content.chars().count() > EXCERPT_LEN {
        text.push('…');
    }
    text
}

fn render_post(out: &mut String, post: &Post) {
    let _ = writeln!(out, "<article class=\"post\">");
    let _ = writeln!(
        out,
        "<h2><a href=\"/api/v1/posts/{}\">{}</a></h2>",
        escape_html(&post.slug),
        escape_html(&post.title)
    );
    let _ = writeln!(
        out,
        "<p class=\"meta\">by {} on {}</p>",
        escape_html(&post.author_full_name),
        escape_html(post.published_at.as_deref().unwrap_or(&post.created_at))
    );
    if let Some(category) = &post.category {
        let _ = writeln!(
            out,
            "<p class=\"category\">{}</p>",
            escape_html(&category.name)
        );
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post
            .tags
            .iter()
            .map(|t| format!("<li>{}</li>", escape_html(&t.name)))
            .collect();
        let _ = writeln!(out, "<ul class=\"tags\">{}</ul>", tags.join(""));
    }
    let _ = writeln!(out, "<p>{}</p>", escape_html(&excerpt(&post.content)));
    let _ = writeln!(out, "</article>");
}

async fn blog_index(
    State(state): State<WebState>,
    OptionalSubject(visitor): OptionalSubject,
) -> Result<impl IntoResponse, ApiError> {
    // A token for a deleted or malformed account renders as anonymous.
    let user = match &visitor {
        Visitor::Authenticated(subject) => match subject.user_id() {
            Ok(id) => state
                .db
                .users()
                .get_by_id(id)
                .await
                .db_err("Failed to get user")?,
            Err(_) => None,
        },
        Visitor::Anonymous => None,
    };

    let posts = state
        .db
        .posts()
        .list_published()
        .await
        .db_err("Failed to list posts")?;

    let mut body = String::new();
    let _ = writeln!(body, "<header>\n<h1>Blog</h1>");
    match &user {
        Some(user) => {
            let _ = writeln!(
                body,
                "<p class=\"session\">Signed in as <strong>{}</strong></p>",
                escape_html(&user.username)
            );
        }
        None => {
            let _ = writeln!(
                body,
                "<p class=\"session\"><a href=\"/login\">Log in</a></p>"
            );
        }
    }
    let _ = writeln!(body, "</header>\n<main>");

    if posts.is_empty() {
        let _ = writeln!(body, "<p class=\"empty\">No posts yet.</p>");
    }
    for post in &posts {
        render_post(&mut body, post);
    }
    let _ = writeln!(body, "</main>");

    Ok(page("Blog", &body))
}

const LOGIN_BODY: &str = r#"<main>
<h1>Log in</h1>
<form id="login-form">
<label>Username or email <input name="login" autocomplete="username" required></label>
<label>Password <input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
<p id="login-error" role="alert"></p>
</form>
</main>
<script>
document.getElementById("login-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const response = await fetch("/api/v1/auth/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ login: form.get("login"), password: form.get("password") }),
  });
  if (response.ok) {
    window.location.href = "/blog";
  } else {
    const body = await response.json().catch(() => ({}));
    document.getElementById("login-error").textContent = body.error || "Login failed";
  }
});
</script>
"#;

async fn login_page() -> Html<String> {
    page("Log in", LOGIN_BODY)
}
