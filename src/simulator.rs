use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::{Client, Url};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum SimulatorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("simulator answered {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

pub trait RoomSimulator: Send + Sync {
    fn status<'a>(&'a self, room_id: &'a str) -> BoxFuture<'a, Result<Value, SimulatorError>>;

    fn admin_detail<'a>(&'a self, room_id: &'a str) -> BoxFuture<'a, Result<Value, SimulatorError>>;
}

pub struct HttpSimulator {
    client: Client,
    base:   Url,
}

impl HttpSimulator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SimulatorError> {
        let base = Url::parse(base_url)
            .map_err(|e| SimulatorError::Other(format!("bad simulator url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SimulatorError::Other(format!("bad simulator url {base_url}")));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    // room ids are opaque; each path segment is escaped
    fn room_url(&self, room_id: &str, call: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().push("rooms").push(room_id).push(call);
        }
        url
    }

    async fn get_json(&self, room_id: &str, call: &str) -> Result<Value, SimulatorError> {
        let resp = self.client.get(self.room_url(room_id, call)).send().await?;
        if !resp.status().is_success() {
            return Err(SimulatorError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }
}

impl RoomSimulator for HttpSimulator {
    fn status<'a>(&'a self, room_id: &'a str) -> BoxFuture<'a, Result<Value, SimulatorError>> {
        Box::pin(self.get_json(room_id, "status"))
    }

    fn admin_detail<'a>(&'a self, room_id: &'a str) -> BoxFuture<'a, Result<Value, SimulatorError>> {
        Box::pin(self.get_json(room_id, "admin-detail"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn fake_room_server() -> String {
        let app = Router::new()
            .route("/rooms/:id/admin-detail", get(|Path(id): Path<String>| async move {
                Json(json!({"roomId": id, "players": [], "entities": [], "eventLog": []}))
            }))
            .route("/rooms/:id/status", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.ok(); });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn detail_is_relayed_verbatim() {
        let sim = HttpSimulator::new(&fake_room_server().await, Duration::from_secs(2)).unwrap();
        let detail = sim.admin_detail("r7").await.unwrap();
        assert_eq!(detail["roomId"], "r7");
        assert!(detail["entities"].is_array());
    }

    #[tokio::test]
    async fn awkward_room_ids_reach_the_right_path() {
        let sim = HttpSimulator::new(&fake_room_server().await, Duration::from_secs(2)).unwrap();
        for id in ["a/b", "team#1", "q?x=1", "a b", "50%"] {
            let detail = sim.admin_detail(id).await.unwrap();
            assert_eq!(detail["roomId"], id);
        }
    }

    #[test]
    fn base_path_is_kept() {
        let sim = HttpSimulator::new("http://sim:9000/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(sim.room_url("a/b", "status").as_str(), "http://sim:9000/v1/rooms/a%2Fb/status");
        assert!(HttpSimulator::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let sim = HttpSimulator::new(&fake_room_server().await, Duration::from_secs(2)).unwrap();
        let err = sim.status("r7").await.unwrap_err();
        assert!(matches!(err, SimulatorError::Status(500)));
        assert_eq!(err.to_string(), "simulator answered 500");
    }

    #[tokio::test]
    async fn unreachable_simulator_is_a_request_error() {
        let sim = HttpSimulator::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(sim.admin_detail("r1").await, Err(SimulatorError::Request(_))));
    }
}
