use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::store::FileStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
}

pub fn router(state: AppState, static_root: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/regions", post(post_region))
        .route("/data/regions.json", get(get_store))
        .with_state(state);
    let app = match static_root {
        Some(root) => app.fallback_service(ServeDir::new(root)),
        None => app,
    };
    app.layer(cors).layer(TraceLayer::new_for_http())
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Upserts `{name, summary?}` into the store.
async fn post_region(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "body must be a JSON object");
    };
    let Some(name) = payload
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "name is required");
    };
    let summary = payload
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    match state.store.upsert(name, summary, Utc::now()).await {
        Ok(outcome) => {
            info!(region = name, ?outcome, "region stored");
            (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
        }
        Err(err) => {
            error!(region = name, "store write failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn get_store(State(state): State<AppState>) -> Response {
    match state.store.raw().await {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            Body::from(text),
        )
            .into_response(),
        Err(err) => {
            error!("store read failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState};
    use crate::store::FileStore;

    fn app(dir: &tempfile::TempDir) -> (Router, Arc<FileStore>) {
        let store = Arc::new(FileStore::new(dir.path().join("regions.json")));
        let app = router(
            AppState {
                store: store.clone(),
            },
            None,
        );
        (app, store)
    }

    async fn post(app: Router, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/regions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn post_creates_record_with_equal_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = app(&dir);

        let (status, body) = post(app, r#"{"name": "Italy", "summary": "text"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let records = store.load().await.unwrap().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Italy");
        assert_eq!(records[0].summary.as_deref(), Some("text"));
        assert!(records[0].created_at.is_some());
        assert_eq!(records[0].created_at, records[0].updated_at);
    }

    #[tokio::test]
    async fn post_without_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = app(&dir);

        let (status, body) = post(app.clone(), r#"{"summary": "x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = post(app.clone(), r#"{"name": 7}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = post(app, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(!store.path().exists(), "rejected requests never write");
    }

    #[tokio::test]
    async fn post_updates_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = app(&dir);
        std::fs::write(
            store.path(),
            r#"[{"name": "Italy", "capital": "Rome", "createdAt": "2020-01-01T00:00:00Z", "updatedAt": "2020-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let (status, _) = post(app, r#"{"name": "Italy", "summary": "new"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let records = store.load().await.unwrap().records();
        assert_eq!(records.len(), 1);
        let italy = &records[0];
        assert_eq!(italy.summary.as_deref(), Some("new"));
        assert_eq!(italy.capital.as_deref(), Some("Rome"));
        assert_eq!(italy.created_at.unwrap().to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert!(italy.updated_at > italy.created_at);
    }

    #[tokio::test]
    async fn corrupt_store_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = app(&dir);
        std::fs::write(store.path(), "{ not an array").unwrap();

        let (status, body) = post(app, r#"{"name": "Italy"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn store_file_is_served_with_empty_default() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _store) = app(&dir);

        let (status, text) = get_text(app.clone(), "/data/regions.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "[]");

        post(app.clone(), r#"{"name": "Peru", "summary": "Andean."}"#).await;
        let (_, text) = get_text(app.clone(), "/data/regions.json").await;
        let served: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(served[0]["name"], "Peru");

        let (status, text) = get_text(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "ok");
    }
}
