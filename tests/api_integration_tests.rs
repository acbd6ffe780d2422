//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tagcache::{api::create_router, backend::MemoryBackend, AppState, Cache};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let cache = Cache::new(Arc::new(MemoryBackend::new(100)));
    create_router(AppState::new(cache))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    tokio_test::assert_ok!(serde_json::from_slice(&bytes))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"test_key","value":"test_value"}"#),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_with_ttl_and_tags() {
    let app = create_test_app();

    let response = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"ttl_key","value":{"a":[1,2]},"ttl":60,"tags":["t1","t2"]}"#),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let set_response = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"user:1","value":{"name":"Ann","roles":["admin"]}}"#),
    )
    .await;
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = send(&app, "GET", "/get/user:1", None).await;

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "user:1");
    assert_eq!(json["value"]["name"], "Ann");
    assert_eq!(json["value"]["roles"][0], "admin");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = send(&app, "GET", "/get/missing", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"gone","value":1}"#)).await;

    let response = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/get/gone", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_key_is_ok() {
    let app = create_test_app();

    let response = send(&app, "DELETE", "/del/never_set", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// == Invalidate Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_endpoint_evicts_tagged_entries() {
    let app = create_test_app();

    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"post1","value":"first","tags":["posts","user:1"]}"#),
    )
    .await;
    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"post2","value":"second","tags":["posts"]}"#),
    )
    .await;
    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"profile","value":"me","tags":["user:2"]}"#),
    )
    .await;

    let response = send(&app, "POST", "/invalidate", Some(r#"{"tags":["posts"]}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tags"][0], "posts");

    for key in ["post1", "post2"] {
        let response = send(&app, "GET", &format!("/get/{}", key), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} should be invalid", key);
    }
    let response = send(&app, "GET", "/get/profile", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_tagged_entry_is_valid_again() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":1,"tags":["t"]}"#)).await;
    send(&app, "POST", "/invalidate", Some(r#"{"tags":["t"]}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":2,"tags":["t"]}"#)).await;

    let response = send(&app, "GET", "/get/k", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], 2);
}

#[tokio::test]
async fn test_invalidate_without_tags_rejected() {
    let app = create_test_app();

    let response = send(&app, "POST", "/invalidate", Some(r#"{"tags":[]}"#)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Clear Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"a","value":1}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"b","value":2}"#)).await;

    let response = send(&app, "POST", "/clear", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    for key in ["a", "b"] {
        let response = send(&app, "GET", &format!("/get/{}", key), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"s","value":"v"}"#)).await;
    send(&app, "GET", "/get/s", None).await;
    send(&app, "GET", "/get/nope", None).await;

    let response = send(&app, "GET", "/stats", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["writes"], 1);
    assert_eq!(json["tracked_entries"], 1);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = send(&app, "GET", "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = send(&app, "PUT", "/set", Some(r#"{"invalid json"#)).await;

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = send(&app, "PUT", "/set", Some(r#"{"key":"","value":"test"}"#)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();

    let set_response = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"ttl_test","value":"expires_soon","ttl":1}"#),
    )
    .await;
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = send(&app, "GET", "/get/ttl_test", None).await;
    assert_eq!(get_response.status(), StatusCode::OK);

    sleep(Duration::from_millis(1100));

    let get_response = send(&app, "GET", "/get/ttl_test", None).await;
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_positive_ttl_deletes() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"neg","value":1}"#)).await;
    let response = send(&app, "PUT", "/set", Some(r#"{"key":"neg","value":2,"ttl":0}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/get/neg", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
