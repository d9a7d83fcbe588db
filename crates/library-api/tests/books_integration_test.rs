//! Integration tests for the book catalog endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use library_api::{models::*, ApiServer, ApiServerConfig};
use library_auth::TokenSettings;
use serde_json::{json, Value};
use tower::ServiceExt; // For `oneshot` method

/// Router over a fresh in-memory database, plus a token for a registered user
async fn create_test_app() -> (Router, String) {
    let db = library_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    library_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: false,
        cors_origins: Vec::new(),
        token_settings: TokenSettings::new(
            b"books-test-secret".to_vec(),
            "library-api",
            "library-frontend",
            Duration::minutes(60),
        )
        .unwrap(),
    };
    let app = ApiServer::new(config, db).unwrap().build_router();

    let credentials = json!({"username": "librarian", "password": "Secret123"});
    let (status, _) = send(&app, request("POST", "/api/auth/register", None, Some(credentials.clone()))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("POST", "/api/auth/login", None, Some(credentials))).await;
    assert_eq!(status, StatusCode::OK);
    let login: LoginResponse = serde_json::from_slice(&body).unwrap();

    (app, login.token)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

async fn create(app: &Router, token: &str, title: &str, author: &str, category: &str) -> Book {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/books",
            Some(token),
            Some(json!({
                "title": title,
                "author": author,
                "description": format!("About {}", title),
                "category": category,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    serde_json::from_slice(&body).unwrap()
}

async fn list(app: &Router, uri: &str) -> Vec<Book> {
    let (status, body) = send(app, request("GET", uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_and_get_book() {
    let (app, token) = create_test_app().await;

    let book = create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;
    assert_eq!(book.title, "Dune");
    assert_eq!(book.description, "About Dune");

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/books/{}", book.id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Book = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched, book);
}

#[tokio::test]
async fn test_create_sets_location_header() {
    let (app, token) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/books",
            Some(&token),
            Some(json!({"title": "Cosmos", "author": "Carl Sagan"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers().get(header::LOCATION).unwrap();
    assert!(location.to_str().unwrap().starts_with("/api/books/"));
}

#[tokio::test]
async fn test_get_missing_book_is_404() {
    let (app, _) = create_test_app().await;

    let (status, body) = send(&app, request("GET", "/api/books/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code.as_deref(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn test_list_filters_by_category_and_search() {
    let (app, token) = create_test_app().await;

    create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;
    create(&app, &token, "Cosmos", "Carl Sagan", "Science").await;
    create(&app, &token, "Contact", "Carl Sagan", "Fiction").await;

    let all = list(&app, "/api/books").await;
    let titles: Vec<_> = all.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Dune", "Cosmos", "Contact"]);

    let fiction = list(&app, "/api/books?category=Fiction").await;
    let titles: Vec<_> = fiction.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Dune", "Contact"]);

    let sagan = list(&app, "/api/books?search=Sagan").await;
    assert_eq!(sagan.len(), 2);

    let sagan_fiction = list(&app, "/api/books?category=Fiction&search=Sagan").await;
    let titles: Vec<_> = sagan_fiction.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Contact"]);

    assert!(list(&app, "/api/books?category=Poetry").await.is_empty());
}

#[tokio::test]
async fn test_mutations_require_token() {
    let (app, token) = create_test_app().await;
    let book = create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;
    let uri = format!("/api/books/{}", book.id);

    let (status, _) = send(
        &app,
        request("POST", "/api/books", None, Some(json!({"title": "X", "author": "Y"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request("PUT", &uri, None, Some(json!({"id": book.id, "title": "X", "author": "Y"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("DELETE", &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public
    let (status, _) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_requires_title_and_author() {
    let (app, token) = create_test_app().await;

    for body in [
        json!({"title": "", "author": "Frank Herbert"}),
        json!({"title": "Dune", "author": "   "}),
        json!({"description": "no title or author"}),
    ] {
        let (status, response) = send(&app, request("POST", "/api/books", Some(&token), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ErrorResponse = serde_json::from_slice(&response).unwrap();
        assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
    }
}

#[tokio::test]
async fn test_update_book() {
    let (app, token) = create_test_app().await;
    let book = create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;
    let uri = format!("/api/books/{}", book.id);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            &uri,
            Some(&token),
            Some(json!({
                "id": book.id,
                "title": "Dune Messiah",
                "author": "Frank Herbert",
                "description": "Sequel",
                "category": "Science Fiction",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, request("GET", &uri, None, None)).await;
    let updated: Book = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.category, "Science Fiction");
}

#[tokio::test]
async fn test_update_id_mismatch_and_missing_book() {
    let (app, token) = create_test_app().await;
    let book = create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/api/books/{}", book.id),
            Some(&token),
            Some(json!({"id": book.id + 1, "title": "Dune", "author": "Frank Herbert"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.message, "Book ID mismatch");

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/api/books/999",
            Some(&token),
            Some(json!({"id": 999, "title": "Ghost", "author": "Nobody"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book() {
    let (app, token) = create_test_app().await;
    let book = create(&app, &token, "Dune", "Frank Herbert", "Fiction").await;
    let uri = format!("/api/books/{}", book.id);

    let (status, _) = send(&app, request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_id_and_query_return_json_errors() {
    let (app, token) = create_test_app().await;

    let cases = [
        request("GET", "/api/books/abc", None, None),
        request("DELETE", "/api/books/abc", Some(&token), None),
        request(
            "PUT",
            "/api/books/1x",
            Some(&token),
            Some(json!({"title": "Dune", "author": "Frank Herbert"})),
        ),
        request("GET", "/api/books?category=a&category=b", None, None),
    ];

    for req in cases {
        let uri = req.uri().to_string();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");

        let error: ErrorResponse = serde_json::from_slice(&body)
            .unwrap_or_else(|e| panic!("{uri} returned a non-JSON body: {e}"));
        assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"), "{uri}");
    }
}
