//! In-process stand-in for the OpinionLens API.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct Backend {
    pub registry: Vec<Value>,
    pub loaded: Vec<Value>,
    pub list_status: Option<u16>,
    pub post_status: Option<u16>,
    pub post_delay: Option<Duration>,
    pub delete_status: Option<u16>,
    pub prediction: Result<&'static str, u16>,
    /// Delay before the predict handler answers.
    pub predict_delay: Option<Duration>,
    /// Fixed batch reply instead of labelling each text.
    pub batch_labels: Option<Vec<&'static str>>,
    pub posts: Vec<Value>,
    pub deletes: Vec<String>,
    pub loaded_fetches: usize,
    pub registry_fetches: usize,
}

impl Backend {
    pub fn new() -> Self {
        Self {
            registry: Vec::new(),
            loaded: Vec::new(),
            list_status: None,
            post_status: None,
            post_delay: None,
            delete_status: None,
            prediction: Ok("POSITIVE"),
            predict_delay: None,
            batch_labels: None,
            posts: Vec::new(),
            deletes: Vec::new(),
            loaded_fetches: 0,
            registry_fetches: 0,
        }
    }
}

pub type Shared = Arc<Mutex<Backend>>;

pub fn registry_entry(name: &str, latest_version: u32) -> Value {
    json!({
        "name": name,
        "latest_version": latest_version,
        "latest_version_creation": "2024-01-01 12:00:00",
    })
}

pub fn loaded_model(name: &str, version: u32, is_default: bool) -> Value {
    json!({
        "name": name,
        "version": version,
        "creation": "2024-01-02 03:04:05",
        "is_default": is_default,
        "model_id": format!("{name}-{version}"),
    })
}

pub async fn spawn(backend: Backend) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/api/v1/about", get(about))
        .route("/api/v1/models/registry", get(registry))
        .route(
            "/api/v1/models/",
            get(list_models).post(fetch_model).delete(delete_model),
        )
        .route("/api/v1/inference/predict", post(predict))
        .route("/api/v1/inference/batch_predict", post(batch_predict))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), shared)
}

/// URL of a port nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn about() -> Json<Value> {
    Json(json!({"title": "OpinionLens", "version": "0.1.0"}))
}

async fn registry(State(b): State<Shared>) -> Response {
    let mut b = b.lock().unwrap();
    b.registry_fetches += 1;
    if let Some(code) = b.list_status {
        return status(code).into_response();
    }
    Json(Value::Array(b.registry.clone())).into_response()
}

async fn list_models(State(b): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Response {
    let mut b = b.lock().unwrap();
    if let Some(id) = q.get("model_id") {
        return match b.loaded.iter().find(|m| m["model_id"] == id.as_str()) {
            Some(m) => Json(json!({"model_id": id, "model_tags": {}, "record": m})).into_response(),
            None => (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"}))).into_response(),
        };
    }

    b.loaded_fetches += 1;
    if let Some(code) = b.list_status {
        return status(code).into_response();
    }
    Json(Value::Array(b.loaded.clone())).into_response()
}

async fn fetch_model(State(b): State<Shared>, Json(body): Json<Value>) -> Response {
    let delay = b.lock().unwrap().post_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut b = b.lock().unwrap();
    b.posts.push(body.clone());
    if let Some(code) = b.post_status {
        return (status(code), Json(json!({"detail": "registry error"}))).into_response();
    }

    let name = body["model_name"].as_str().unwrap_or_default().to_string();
    let version = body["model_version"].as_u64().unwrap_or_default() as u32;
    let set_default = body["set_default"].as_bool().unwrap_or(false);
    let id = format!("{name}-{version}");

    if set_default {
        for m in b.loaded.iter_mut() {
            m["is_default"] = json!(false);
        }
    }
    match b.loaded.iter().position(|m| m["model_id"] == id.as_str()) {
        Some(i) => {
            if set_default {
                b.loaded[i]["is_default"] = json!(true);
            }
        }
        None => b.loaded.push(loaded_model(&name, version, set_default)),
    }

    (
        StatusCode::CREATED,
        Json(json!({"model_id": id, "message": format!("Model {id:?} saved")})),
    )
        .into_response()
}

async fn delete_model(State(b): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Response {
    let mut b = b.lock().unwrap();
    let id = q.get("model_id").cloned().unwrap_or_default();
    b.deletes.push(id.clone());
    if let Some(code) = b.delete_status {
        return status(code).into_response();
    }

    let before = b.loaded.len();
    b.loaded.retain(|m| m["model_id"] != id.as_str());
    if b.loaded.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"}))).into_response();
    }
    Json(json!({"message": format!("Model {id:?} was deleted successfully.")})).into_response()
}

async fn predict(State(b): State<Shared>, Json(body): Json<Value>) -> Response {
    let delay = b.lock().unwrap().predict_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let b = b.lock().unwrap();
    if body["text"].as_str().unwrap_or_default().is_empty() {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    match b.prediction {
        Ok(label) => Json(json!({"prediction": label})).into_response(),
        Err(code) => (status(code), Json(json!({"detail": "model unavailable"}))).into_response(),
    }
}

async fn batch_predict(State(b): State<Shared>, Json(batch): Json<Vec<String>>) -> Json<Vec<&'static str>> {
    if let Some(labels) = b.lock().unwrap().batch_labels.clone() {
        return Json(labels);
    }
    Json(
        batch
            .iter()
            .map(|t| if t.contains("bad") { "NEGATIVE" } else { "POSITIVE" })
            .collect(),
    )
}
