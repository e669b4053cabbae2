use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// `/flaky` answers 503 this many times before it succeeds.
pub const FLAKY_FAILURES: usize = 2;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
}

#[derive(Clone, Default)]
pub struct AppState {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
    flaky_hits: Arc<AtomicUsize>,
}

pub fn app() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item)
                .put(replace_item)
                .patch(update_item)
                .delete(delete_item),
        )
        .route("/status/{code}", get(status).post(status))
        .route("/flaky", get(flaky))
        .route("/slow", get(slow))
        .route("/text", get(text))
        .route("/blob", get(blob))
        .route("/headers", get(echo_headers))
        .route("/echo", post(echo_body))
        .route("/upload", post(upload))
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    tracing::info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

/// `?ids=1,2` answers `{"n":2,"ids":["1","2"]}`; without `ids` every stored
/// item is listed.
async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if let Some(ids) = params.get("ids") {
        let ids: Vec<&str> = ids.split(',').filter(|id| !id.is_empty()).collect();
        return Json(json!({ "n": ids.len(), "ids": ids }));
    }
    let items = state.items.read().await;
    let items: Vec<Item> = items.values().cloned().collect();
    Json(json!({ "n": items.len(), "items": items }))
}

async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateItem>,
) -> (StatusCode, Json<Item>) {
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
    };
    state.items.write().await.insert(item.id, item.clone());
    tracing::debug!(id = %item.id, "created item");
    (StatusCode::CREATED, Json(item))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, StatusCode> {
    let items = state.items.read().await;
    items.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateItem>,
) -> Result<Json<Item>, StatusCode> {
    let mut items = state.items.write().await;
    let item = items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    item.name = input.name;
    Ok(Json(item.clone()))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItem>,
) -> Result<Json<Item>, StatusCode> {
    let mut items = state.items.write().await;
    let item = items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        item.name = name;
    }
    Ok(Json(item.clone()))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut items = state.items.write().await;
    items.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

/// Answer with the requested status and a plain-text body naming it.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn flaky(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let hit = state.flaky_hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hit <= FLAKY_FAILURES {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "hit": hit })))
    } else {
        (StatusCode::OK, Json(json!({ "hit": hit })))
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "finally"
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "plain text")
}

async fn blob() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0u8, 1, 2, 254, 255],
    )
}

/// Echo request headers as a JSON object with lowercase names.
async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let echoed: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(json!(echoed))
}

/// Echo the raw body along with its content type.
async fn echo_body(headers: HeaderMap, body: String) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    Json(json!({ "content_type": content_type, "body": body }))
}

/// List multipart fields as `name -> text value or byte length`.
async fn upload(
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut fields = serde_json::Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = if field.file_name().is_some() {
            let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            json!(bytes.len())
        } else {
            json!(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?)
        };
        fields.insert(name, value);
    }
    Ok(Json(json!({ "content_type": content_type, "fields": fields })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: Uuid::nil(),
            name: "Test".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Test");
    }

    #[test]
    fn create_item_rejects_missing_name() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_item_name_is_optional() {
        let input: UpdateItem = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
    }
}
