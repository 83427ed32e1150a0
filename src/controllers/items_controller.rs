use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    error::StoreError,
    models::{NewItem, WatchedItem},
};

fn items_response(items: &[WatchedItem]) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "items": items }))).into_response()
}

// GET /api/items
pub async fn list_items(State(state): State<AppState>) -> Response {
    let items = state.store.snapshot().await;
    (StatusCode::OK, Json(items.to_vec())).into_response()
}

// POST /api/items
pub async fn add_item(State(state): State<AppState>, Json(body): Json<NewItem>) -> Response {
    match state.store.add(body).await {
        Ok(items) => items_response(&items),
        Err(StoreError::Validation(e)) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        Err(StoreError::Persistence(e)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("could not save watchlist: {e}")).into_response()
        }
    }
}

// DELETE /api/items/:id
pub async fn remove_item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.remove(&id).await {
        Ok(items) => items_response(&items),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("could not save watchlist: {e}")).into_response()
        }
    }
}
