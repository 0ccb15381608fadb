//! Router tests for API handlers

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::routes::create_router;
use crate::state::AppState;

fn app(backup_root: &std::path::Path) -> Router {
    let config = AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        backup_root: backup_root.to_string_lossy().into_owned(),
        batch_size: 1000,
        compression_level: 9,
        default_charset: "utf8".to_string(),
    };
    create_router(AppState::new(&config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let root = tempfile::tempdir().unwrap();
    let response = app(root.path()).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_download_streams_artifact() {
    let root = tempfile::tempdir().unwrap();
    let name = "backup-shop-2024-01-02-03-04-05.sql";
    std::fs::write(root.path().join(name), b"SET foreign_key_checks = 1;").unwrap();

    let response = app(root.path())
        .oneshot(get(&format!("/api/backups/{}/download", name)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{}\"", name)
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "27");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"SET foreign_key_checks = 1;");
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let root = tempfile::tempdir().unwrap();
    let response = app(root.path())
        .oneshot(get("/api/backups/..%2Fbackup-x.sql/download"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing() {
    let root = tempfile::tempdir().unwrap();
    let response = app(root.path())
        .oneshot(get("/api/backups/backup-none.sql.gz/download"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_create_backup_requires_database() {
    let root = tempfile::tempdir().unwrap();
    let response = app(root.path())
        .oneshot(post_json(
            "/api/backups",
            json!({"host": "127.0.0.1", "username": "root", "database": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_create_backup_unreachable_server() {
    let root = tempfile::tempdir().unwrap();
    let response = app(root.path())
        .oneshot(post_json(
            "/api/backups",
            json!({
                "host": "127.0.0.1",
                "port": 1,
                "username": "root",
                "password": "wrong",
                "database": "shop"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "connection_error");
    assert_eq!(body["log"], "");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
