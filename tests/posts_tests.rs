mod common;

use axum::http::{StatusCode, header};
use common::{Session, TestApp, body_bytes, body_json, get_request, json_request};
use serde_json::{Value, json};

async fn create_post(app: &TestApp, session: &Session, payload: Value) -> (StatusCode, Value) {
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts",
            &payload,
            Some((session, true)),
        ))
        .await;
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_create_post_generates_slug() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;

    let (status, json) = create_post(
        &app,
        &session,
        json!({
            "title": "My First Blog Post! hey",
            "content": "Hello there",
            "category": "Rust Things",
            "tags": ["Web", "Async", "web"],
            "publish": true,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["slug"], "my-first-blog-post-hey");
    assert_eq!(json["status"], "published");
    assert_eq!(json["author"]["username"], "writer");
    assert_eq!(json["category"]["slug"], "rust-things");
    let tags: Vec<&str> = json["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();
    assert_eq!(tags, ["async", "web"]);
}

#[tokio::test]
async fn test_create_post_requires_csrf_header() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts",
            &json!({ "title": "Sneaky" }),
            Some((&session, false)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "CSRF token missing");
}

#[tokio::test]
async fn test_create_post_requires_session() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts",
            &json!({ "title": "Anonymous" }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_post_slug_rules() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;

    let (status, _) = create_post(&app, &session, json!({ "title": "Same", "slug": "same" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = create_post(&app, &session, json!({ "title": "Same again" , "slug": "same" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Slug already in use");

    let (status, _) = create_post(&app, &session, json!({ "title": "Bad", "slug": "Not Valid" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = create_post(&app, &session, json!({ "title": "!!!" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Could not derive a slug from the title");

    let (status, json) = create_post(&app, &session, json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Title cannot be empty");
}

#[tokio::test]
async fn test_drafts_are_not_public() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;

    let (status, _) = create_post(&app, &session, json!({ "title": "Draft Post" })).await;
    assert_eq!(status, StatusCode::CREATED);
    create_post(&app, &session, json!({ "title": "Live Post", "publish": true })).await;

    let response = app.send(get_request("/api/v1/posts", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let slugs: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, ["live-post"]);

    let response = app
        .send(get_request("/api/v1/posts/draft-post", None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get_request("/api/v1/posts/live-post", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Live Post");
}

#[tokio::test]
async fn test_comments() {
    let app = TestApp::new().await;
    let writer = app.signed_in("writer").await;
    let reader = app.signed_in("reader").await;
    create_post(&app, &writer, json!({ "title": "Discuss", "publish": true })).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts/discuss/comments",
            &json!({ "content": "Nice post" }),
            Some((&reader, true)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["author_username"], "reader");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts/discuss/comments",
            &json!({ "content": "" }),
            Some((&reader, true)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts/discuss/comments",
            &json!({ "content": "x".repeat(2001) }),
            Some((&reader, true)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts/missing/comments",
            &json!({ "content": "Hello?" }),
            Some((&reader, true)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(get_request("/api/v1/posts/discuss/comments", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["content"], "Nice post");
}

#[tokio::test]
async fn test_categories_and_tags_listing() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;
    create_post(
        &app,
        &session,
        json!({ "title": "One", "category": "News", "tags": ["b", "a"] }),
    )
    .await;

    let json = body_json(app.send(get_request("/api/v1/categories", None)).await).await;
    assert_eq!(json[0]["slug"], "news");

    let json = body_json(app.send(get_request("/api/v1/tags", None)).await).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["name"], "a");
}

#[tokio::test]
async fn test_blog_page_anonymous_and_signed_in() {
    let app = TestApp::new().await;
    let session = app.signed_in("writer").await;
    create_post(
        &app,
        &session,
        json!({ "title": "<script>alert(1)</script> Escaped", "content": "Body", "publish": true }),
    )
    .await;

    let response = app.send(get_request("/blog", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("href=\"/login\""));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; Escaped"));
    assert!(!html.contains("<script>alert(1)"));

    let response = app
        .send(get_request("/blog", Some(&session.cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Signed in as <strong>writer</strong>"));

    // A broken token renders the anonymous page instead of failing
    let response = app
        .send(get_request("/blog", Some("access_token=garbage")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("href=\"/login\""));
}

#[tokio::test]
async fn test_home_page_and_login_page() {
    let app = TestApp::new().await;

    // No markdown file yet
    let response = app.send(get_request("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("href=\"/blog\""));

    std::fs::write(
        app.static_dir.path().join("primary.md"),
        "# About me\n\n| Skill | Years |\n|-------|-------|\n| Rust  | 5     |\n",
    )
    .unwrap();
    let response = app.send(get_request("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<h1>About me</h1>"));
    assert!(html.contains("<td>Rust</td>"));

    let response = app.send(get_request("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("/api/v1/auth/login"));
}

#[tokio::test]
async fn test_writes_for_deleted_account() {
    let app = TestApp::new().await;
    let writer = app.signed_in("writer").await;
    let ghost = app.signed_in("ghost").await;
    create_post(&app, &writer, json!({ "title": "Discuss", "publish": true })).await;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(ghost.user_id)
        .execute(app.db.pool())
        .await
        .unwrap();

    let (status, json) = create_post(&app, &ghost, json!({ "title": "Orphan" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "User not found");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/posts/discuss/comments",
            &json!({ "content": "Boo" }),
            Some((&ghost, true)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "User not found");
}
