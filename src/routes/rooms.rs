use axum::{
    routing::{get, post},
    extract::{Extension, Json, Path},
    Router,
};
use serde_json::{json, Value};

use crate::{
    directory::{AdminStatus, DirectoryHandle},
    error::AppResult,
    state::{Mutation, RoomUpdate},
};

pub fn router() -> Router {
    Router::new()
        .route("/room-update",       post(room_update))
        .route("/rooms",             get(rooms))
        .route("/archived-rooms",    get(archived_rooms))
        .route("/admin-status",      get(admin_status))
        .route("/rooms/:id/status",  get(room_status))
}

/* ---------------- lifecycle API / simulators ---------------- */
async fn room_update(
    Extension(dir): Extension<DirectoryHandle>,
    Json(update): Json<RoomUpdate>,
) -> AppResult<Json<Value>> {
    dir.apply(Mutation::try_from(update)?).await?;
    Ok(Json(json!({"ok": true})))
}

/* ---------------- 非即時備援 ---------------- */
async fn rooms(Extension(dir): Extension<DirectoryHandle>) -> AppResult<Json<Value>> {
    Ok(Json(json!({"rooms": dir.list_public().await?})))
}

async fn archived_rooms(Extension(dir): Extension<DirectoryHandle>) -> AppResult<Json<Value>> {
    Ok(Json(json!({"rooms": dir.list_archived().await?})))
}

async fn admin_status(Extension(dir): Extension<DirectoryHandle>) -> AppResult<Json<AdminStatus>> {
    Ok(Json(dir.admin_status().await?))
}

async fn room_status(
    Extension(dir): Extension<DirectoryHandle>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    Ok(Json(dir.room_status(&id).await?))
}
