#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use mira_core::rating::RatingConfig;
use mira_db::models::experiment::CreateImage;
use mira_db::repositories::ExperimentRepo;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use mira_api::config::ServerConfig;
use mira_api::router::build_app_router;
use mira_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        db_max_connections: 5,
        ranking: RatingConfig::default(),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    build_app_router(AppState::new(pool, config.clone()), &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Create an experiment holding `count` images and return its id.
pub async fn seed_experiment(pool: &PgPool, name: &str, count: usize) -> i64 {
    let experiment = ExperimentRepo::create(pool, name).await.unwrap();
    for i in 0..count {
        ExperimentRepo::create_image(
            pool,
            &CreateImage {
                experiment_id: experiment.id,
                filename: format!("{name}_{i}.tif"),
                file_path: format!("/data/{name}/{i}.tif"),
                thumbnail_path: Some(format!("/thumbs/{name}/{i}.png")),
            },
        )
        .await
        .unwrap();
    }
    experiment.id
}

/// Create a metric through the API, import `count` images into it, and
/// return the metric id.
pub async fn seed_metric(app: &Router, pool: &PgPool, name: &str, count: usize) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/metrics",
        serde_json::json!({ "name": name }),
    )
    .await;
    let metric_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    if count > 0 {
        let experiment_id = seed_experiment(pool, name, count).await;
        let response = post_json(
            app.clone(),
            &format!("/api/v1/metrics/{metric_id}/images/import"),
            serde_json::json!({ "experiment_ids": [experiment_id] }),
        )
        .await;
        assert_eq!(response.status(), 200);
    }
    metric_id
}

/// Ids of a metric's images in import order.
pub async fn image_ids(app: &Router, metric_id: i64) -> Vec<i64> {
    let response = get(app.clone(), &format!("/api/v1/metrics/{metric_id}/images")).await;
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["id"].as_i64().unwrap())
        .collect()
}
