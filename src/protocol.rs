use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{ArchivedRoomSummary, RoomSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetailResult {
    Detail(Value),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Rooms { rooms: Vec<RoomSummary> },
    ArchivedRooms { rooms: Vec<ArchivedRoomSummary> },
    AdminRooms {
        rooms:          Vec<RoomSummary>,
        archived_rooms: Vec<ArchivedRoomSummary>,
        lobby_clients:  usize,
        kv_key_count:   i64,
        fetched_at:     i64,
    },
    AdminAllDetails {
        details:    BTreeMap<String, DetailResult>,
        fetched_at: i64,
    },
    RoomDetail { room_id: String, detail: Value, fetched_at: i64 },
    RoomDetailError { room_id: String, error: String },
}

impl ServerMessage {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to encode server message");
            String::from("{}")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    SubscribeAll,
    UnsubscribeAll,
    SubscribeRoom { room_id: String },
    UnsubscribeRoom { room_id: String },
    Refresh,
}

impl ClientMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
