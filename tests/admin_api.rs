//! Authoring API behaviour: slug derivation, excerpt derivation, and the
//! JSON error envelope.

mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use support::InMemoryStore;

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collected body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn create_post_derives_slug_and_excerpt() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let request = json_request(
        Method::POST,
        "/api/posts",
        &json!({
            "title": "Hello World",
            "body_markdown": "# Intro\n\nA longer body for the excerpt derivation to chew on.",
            "author": "wei",
            "category_id": category.id,
        }),
    );

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let post = json_body(response).await;
    assert_eq!(post["slug"], "hello-world");
    assert_eq!(post["author"], "wei");

    let excerpt = post["excerpt"].as_str().expect("excerpt string");
    assert!(excerpt.starts_with("Intro"));
    assert!(excerpt.chars().count() <= 54);
}

#[tokio::test]
async fn duplicate_titles_get_suffixed_slugs() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let payload = json!({
        "title": "Hello World",
        "body_markdown": "body",
        "author": "wei",
        "category_id": category.id,
    });

    let first = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/posts", &payload))
        .await
        .expect("response");
    assert_eq!(json_body(first).await["slug"], "hello-world");

    let second = app
        .oneshot(json_request(Method::POST, "/api/posts", &payload))
        .await
        .expect("response");
    assert_eq!(json_body(second).await["slug"], "hello-world-2");
}

#[tokio::test]
async fn explicit_excerpt_is_kept_verbatim() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let request = json_request(
        Method::POST,
        "/api/posts",
        &json!({
            "title": "Custom excerpt",
            "body_markdown": "The body is much longer than the supplied excerpt.",
            "excerpt": "hand-written summary",
            "author": "wei",
            "category_id": category.id,
        }),
    );

    let response = app.oneshot(request).await.expect("response");
    let post = json_body(response).await;
    assert_eq!(post["excerpt"], "hand-written summary");
}

#[tokio::test]
async fn chinese_titles_are_transliterated() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let request = json_request(
        Method::POST,
        "/api/posts",
        &json!({
            "title": "分页算法",
            "body_markdown": "body",
            "author": "wei",
            "category_id": category.id,
        }),
    );

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["slug"], "fen-ye-suan-fa");
}

#[tokio::test]
async fn create_post_rejects_blank_title_and_unknown_category() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let blank = json_request(
        Method::POST,
        "/api/posts",
        &json!({
            "title": "   ",
            "body_markdown": "body",
            "author": "wei",
            "category_id": category.id,
        }),
    );
    let response = app.clone().oneshot(blank).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "validation_failed");

    let unknown = json_request(
        Method::POST,
        "/api/posts",
        &json!({
            "title": "Fine title",
            "body_markdown": "body",
            "author": "wei",
            "category_id": Uuid::new_v4(),
        }),
    );
    let response = app.oneshot(unknown).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "unknown_category");
}

#[tokio::test]
async fn update_and_delete_unknown_post_are_not_found() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let request = json_request(
        Method::PATCH,
        &format!("/api/posts/{}", Uuid::new_v4()),
        &json!({
            "title": "Renamed",
            "body_markdown": "body",
            "category_id": category.id,
        }),
    );
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "unknown_post");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/posts/{}", Uuid::new_v4()))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_rederives_excerpt_when_cleared() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let created = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/posts",
            &json!({
                "title": "Original",
                "body_markdown": "Original body.",
                "excerpt": "explicit",
                "author": "wei",
                "category_id": category.id,
            }),
        ))
        .await
        .expect("response");
    let id = json_body(created).await["id"].as_str().unwrap().to_string();

    let updated = app
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/posts/{id}"),
            &json!({
                "title": "Original",
                "body_markdown": "Rewritten body that now feeds the excerpt.",
                "category_id": category.id,
            }),
        ))
        .await
        .expect("response");
    assert_eq!(updated.status(), StatusCode::OK);

    let post = json_body(updated).await;
    let excerpt = post["excerpt"].as_str().expect("excerpt string");
    assert!(excerpt.starts_with("Rewritten body"));
}

#[tokio::test]
async fn delete_post_removes_it() {
    let store = InMemoryStore::new();
    let category = store.add_category("tech", "Tech").await;
    let app = support::admin_app(&store);

    let created = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/posts",
            &json!({
                "title": "Short lived",
                "body_markdown": "body",
                "author": "wei",
                "category_id": category.id,
            }),
        ))
        .await
        .expect("response");
    let id = json_body(created).await["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/posts/{id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.posts.lock().await.is_empty());
}

#[tokio::test]
async fn categories_and_tags_are_created_with_derived_slugs() {
    let store = InMemoryStore::new();
    let app = support::admin_app(&store);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/categories",
            &json!({ "name": "Web Development" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["slug"], "web-development");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/tags",
            &json!({ "name": "算法" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["slug"], "suan-fa");

    // A second category with the same name is a conflict.
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/categories",
            &json!({ "name": "Web Development" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], "duplicate");
}
