use axum::{routing::get, Router};

pub mod rooms;
pub mod ws;

pub fn router() -> Router {
    Router::new()
        .merge(rooms::router())
        .merge(ws::router())
        .route("/health", get(|| async { "ok" }))
}
