use axum::{http::StatusCode, response::IntoResponse};
use std::fmt::Display;

use crate::simulator::SimulatorError;

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("Bad request: {0}")]
    Bad(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("Directory unavailable")]
    Unavailable,

    #[error("Simulator: {0}")]
    Upstream(#[from] SimulatorError),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("DB: {0}")]
    Db(#[from] sqlx::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let code = match &self {
            AppErr::Bad(_)      => StatusCode::BAD_REQUEST,
            AppErr::NotFound(_) => StatusCode::NOT_FOUND,
            AppErr::Conflict(_) => StatusCode::CONFLICT,
            AppErr::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppErr::Upstream(_) => StatusCode::BAD_GATEWAY,
            _                   => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (code, self.to_string()).into_response()
    }
}

/* ── 小助手：把任何 error 轉成 Bad / Config ── */
pub fn bad<E: Display>(e: E) -> AppErr { AppErr::Bad(e.to_string()) }

pub fn config<E: Display>(e: E) -> AppErr { AppErr::Config(e.to_string()) }
