use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{
    app::{AppFactory, AppPaths},
    books::BookCreate,
    web,
};

fn fresh_router() -> (Router, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let app = AppFactory::create_app(&AppPaths::new(tmp.path().to_str().unwrap())).unwrap();

    for (title, description, isbn) in [
        ("Starship Robots", "space opera with robots", "1"),
        ("Robot Wars", "robots and space battles", "2"),
        ("Kitchen Hearts", "a romance novel about cooking", "3"),
    ] {
        app.create_book(BookCreate {
            title: title.into(),
            description: description.into(),
            isbn: isbn.into(),
            ..Default::default()
        })
        .unwrap();
    }

    (web::router(Arc::new(app)), tmp)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    with_json(Request::post(uri), body)
}

fn put(uri: &str, body: Value) -> Request<Body> {
    with_json(Request::put(uri), body)
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

fn with_json(builder: axum::http::request::Builder, body: Value) -> Request<Body> {
    builder
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn list_books() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, get("/api/books")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[1]["title"], "Robot Wars");
}

#[tokio::test(flavor = "multi_thread")]
async fn recommend_for_posted_favorites() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, post("/api/recommendations", json!({"favorites": [0]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Robot Wars"]));

    let (status, body) = send(
        &router,
        post(
            "/api/recommendations",
            json!({"favorites": [0], "num_recommendations": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn recommend_for_user_favorites() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, get("/api/recommendations?user=alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(
        &router,
        post("/api/favorites", json!({"user": "alice", "book_id": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, get("/api/favorites?user=alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Starship Robots");

    let (status, body) = send(
        &router,
        get("/api/recommendations?user=alice&num_recommendations=3&similarity_threshold=0.05"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Robot Wars"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_overrides_are_bad_requests() {
    let (router, _tmp) = fresh_router();

    for uri in [
        "/api/recommendations?user=alice&num_recommendations=-1",
        "/api/recommendations?user=alice&max_features=0",
        "/api/recommendations?user=alice&similarity_threshold=1.5",
    ] {
        let (status, body) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_ids_are_not_found() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, post("/api/recommendations", json!({"favorites": [0, 99]}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "book not found");

    let (status, _) = send(
        &router,
        post("/api/favorites", json!({"user": "alice", "book_id": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_isbn_is_conflict() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(
        &router,
        post("/api/books", json!({"title": "Robot Wars II", "isbn": "2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("id 1"));

    let (status, body) = send(
        &router,
        post("/api/books", json!({"title": "Robot Peace", "isbn": "4"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn padded_isbn_is_conflict() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(
        &router,
        post("/api/books", json!({"title": "Robot Wars II", "isbn": " 2 "})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("id 1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn book_detail_update_and_delete() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, get("/api/books/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Robot Wars");

    let (status, body) = send(
        &router,
        put("/api/books/1", json!({"author": "R. Daneel", "isbn": "22"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"], "R. Daneel");
    assert_eq!(body["isbn"], "22");
    assert_eq!(body["title"], "Robot Wars");

    let (status, _) = send(&router, put("/api/books/2", json!({"isbn": "22"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&router, delete("/api/books/1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for request in [
        get("/api/books/1"),
        delete("/api/books/1"),
        put("/api/books/1", json!({"title": "Gone"})),
    ] {
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "book not found");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn search_books_by_title() {
    let (router, _tmp) = fresh_router();

    let (status, body) = send(&router, get("/api/books?search=robot")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Starship Robots", "Robot Wars"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_favorite() {
    let (router, _tmp) = fresh_router();

    let favorite = json!({"user": "alice", "book_id": 0});
    let (status, _) = send(&router, post("/api/favorites", favorite.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, with_json(Request::delete("/api/favorites"), favorite.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&router, get("/api/favorites?user=alice")).await;
    assert_eq!(body, json!([]));

    let (status, _) = send(&router, with_json(Request::delete("/api/favorites"), favorite)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
