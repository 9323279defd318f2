//! Integration tests for the Storefront Insights HTTP API
//!
//! Builds the real router over an in-memory source and sends requests via
//! tower::ServiceExt.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_insights::api::create_app;
use storefront_insights::core::config::InsightsMode;
use storefront_insights::core::{AppState, Config, EntityType, SnapshotStore};
use storefront_insights::sources::StaticSource;

fn fixture_source() -> StaticSource {
    StaticSource::new()
        .with_items(
            EntityType::Product,
            vec![
                json!({"id": 1, "title": "Backpack", "price": 109.95, "category": "men's clothing"}),
                json!({"id": 2, "title": "T-Shirt", "price": 22.3, "category": "men's clothing"}),
                json!({"id": 5, "title": "Bracelet", "price": 695, "category": "jewelery"}),
            ],
        )
        .with_items(
            EntityType::User,
            vec![
                json!({"phone": "(272) 790-0888", "name": {"first": "Brad"}}),
                json!({"phone": "015242 07811", "name": {"first": "Ella"}}),
            ],
        )
        .with_items(
            EntityType::Transaction,
            vec![
                json!({"parcel_id": "1", "user_phone": "(272) 790-0888"}),
                json!({"parcel_id": 5, "user_phone": "(272) 790-0888"}),
                json!({"parcel_id": "2", "user_phone": "015242 07811"}),
                json!({"parcel_id": "99", "user_phone": "015242 07811"}),
                json!({"parcel_id": "2"}),
            ],
        )
}

async fn test_app_with(source: StaticSource, mode: InsightsMode) -> axum::Router {
    let mut config = Config::default();
    config.pipeline.product_insights = mode;

    let store = Arc::new(SnapshotStore::initialize(Arc::new(source)).await);
    create_app(AppState::new(store, config))
}

async fn test_app() -> axum::Router {
    test_app_with(fixture_source(), InsightsMode::Snapshot).await
}

async fn send(app: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

// ---------------------------------------------------------------
// Data endpoints
// ---------------------------------------------------------------

#[tokio::test]
async fn test_get_data_returns_envelopes() {
    let (status, json) = get(test_app().await, "/data/product").await;

    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["entity_type"], "product");
    assert!(records[0]["entity_id"].as_str().unwrap().starts_with("product-"));
    assert_eq!(records[0]["payload"]["title"], "Backpack");
    assert!(records[0]["provenance"]["source"].is_string());
}

#[tokio::test]
async fn test_get_data_transactions_are_enriched() {
    let (status, json) = get(test_app().await, "/data/transaction").await;

    assert_eq!(status, StatusCode::OK);
    let first = &json[0]["payload"];
    assert_eq!(first["product_details"]["title"], "Backpack");
    assert_eq!(first["user_details"]["name"]["first"], "Brad");

    let unmatched = &json[3]["payload"];
    assert_eq!(unmatched["product_details"], json!({}));
}

#[tokio::test]
async fn test_get_data_invalid_entity_type() {
    let (status, json) = get(test_app().await, "/data/order").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid entity type");
    assert_eq!(json["details"]["entity_type"], "order");
}

// ---------------------------------------------------------------
// Insight endpoints
// ---------------------------------------------------------------

#[tokio::test]
async fn test_user_insights() {
    let (status, json) = get(test_app().await, "/insights/users").await;

    assert_eq!(status, StatusCode::OK);
    let brad = json["user_spending"]["(272) 790-0888"].as_f64().unwrap();
    assert!((brad - 804.95).abs() < 1e-9);
    assert_eq!(json["user_spending"]["015242 07811"], 22.3);
    assert_eq!(json["unattributed_spending"], 22.3);
}

#[tokio::test]
async fn test_product_insights() {
    let (status, json) = get(test_app().await, "/insights/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["most_popular_category"], "men's clothing");
    assert_eq!(json["purchase_count"], 3);
    assert_eq!(json["category_data"], json!({"men's clothing": 3, "jewelery": 1}));
}

#[tokio::test]
async fn test_product_insights_live_mode() {
    let app = test_app_with(fixture_source(), InsightsMode::Live).await;
    let (status, json) = get(app, "/insights/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["purchase_count"], 3);
}

#[tokio::test]
async fn test_insights_on_empty_data() {
    let app = test_app_with(StaticSource::new(), InsightsMode::Live).await;

    let (_, users) = get(app.clone(), "/insights/users").await;
    assert_eq!(users["user_spending"], json!({}));
    assert_eq!(users["unattributed_spending"], Value::Null);

    let (_, products) = get(app.clone(), "/insights/products").await;
    assert_eq!(products["most_popular_category"], Value::Null);
    assert_eq!(products["purchase_count"], 0);
    assert_eq!(products["category_data"], json!({}));

    let (_, txns) = get(app, "/insights/transactions").await;
    assert_eq!(txns["average_transaction_value"], 0.0);
    assert_eq!(txns["transaction_count"], 0);
}

#[tokio::test]
async fn test_transaction_insights() {
    let (status, json) = get(test_app().await, "/insights/transactions").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transaction_count"], 5);
    let average = json["average_transaction_value"].as_f64().unwrap();
    assert!((average - (109.95 + 695.0 + 22.3 + 22.3) / 5.0).abs() < 1e-9);
}

// ---------------------------------------------------------------
// Snapshot and system endpoints
// ---------------------------------------------------------------

#[tokio::test]
async fn test_refresh_reports_counts() {
    let (status, json) = send(test_app().await, Method::POST, "/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["products"], 3);
    assert_eq!(json["data"]["users"], 2);
    assert_eq!(json["data"]["transactions"], 5);
}

#[tokio::test]
async fn test_health_and_info() {
    let app = test_app().await;

    let (status, health) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, info) = get(app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["entity_types"], json!(["product", "user", "transaction"]));
    assert_eq!(info["product_insights"], "snapshot");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app().await;
    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("si_fetches_total"));
}
