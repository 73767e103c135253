use axum::{
    Router, routing::get, response::IntoResponse,
    extract::{ws::{WebSocketUpgrade, WebSocket, Message}, Query, Extension},
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::directory::{sessions::{self, Role}, DirectoryHandle};

#[derive(Deserialize)]
struct WsQuery {
    #[serde(default)]
    admin: bool,
}

pub fn router() -> Router {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
    Extension(dir): Extension<DirectoryHandle>,
) -> impl IntoResponse {
    let role = if q.admin { Role::Admin } else { Role::Lobby };
    ws.on_upgrade(move |s| session_ws(s, role, dir))
}

/* ---------------- per socket ---------------- */
async fn session_ws(sock: WebSocket, role: Role, dir: DirectoryHandle) {
    let (mut sink, mut stream) = sock.split();
    let (outbox, mut rx) = sessions::outbox();

    let Ok(id) = dir.connect(role, outbox).await else {
        debug!("directory unavailable, closing socket");
        return;
    };

    /* 寫出：目錄 → socket */
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() { break; }
        }
    });

    /* 讀入：socket → 目錄 */
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(raw)) => dir.client_text(id, raw).await,
            Ok(Message::Close(_))  => break,
            Ok(_)                  => {}
            Err(e) => { debug!(session = %id, error = %e, "socket error"); break; }
        }
    }

    dir.disconnect(id).await;
    writer.abort();
}
