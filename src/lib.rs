pub mod config;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod routes;
pub mod simulator;
pub mod state;
pub mod store;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::directory::DirectoryHandle;

pub const BODY_LIMIT: usize = 1024 * 1024;

pub fn app(directory: DirectoryHandle) -> Router {
    routes::router()
        .layer(Extension(directory))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}
