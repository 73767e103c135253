use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{bad, AppErr};

/* ------------ 進行中的房間 ------------ */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Playing,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id:           String,
    pub name:         String,
    pub player_count: u32,
    pub created_at:   i64,                 // unix ms
    pub created_by:   String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private:   Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase:        Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave:         Option<u32>,
}

impl RoomSummary {
    pub fn is_public(&self) -> bool {
        self.is_private != Some(true)
    }
}

/* ------------ 已結束的房間 ------------ */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedPlayer {
    pub id:       String,
    pub username: String,
    pub score:    i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRoomSummary {
    pub id:         String,
    pub name:       String,
    pub ended_at:   i64,                   // unix ms
    pub duration:   i64,                   // ms
    pub final_wave: u32,
    pub final_puzzle_progress: f64,
    #[serde(default)]
    pub players:    Vec<ArchivedPlayer>,
    #[serde(default)]
    pub player_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log:  Option<Vec<Value>>,
}

/* ------------ 生命週期變更 ------------ */
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Upsert(RoomSummary),
    Delete(String),
    Archive(ArchivedRoomSummary),
}

impl Mutation {
    pub fn room_id(&self) -> &str {
        match self {
            Mutation::Upsert(r)  => &r.id,
            Mutation::Delete(id) => id,
            Mutation::Archive(a) => &a.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Upsert,
    Delete,
    Archive,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    pub action:        UpdateAction,
    pub room:          Option<RoomSummary>,
    pub room_id:       Option<String>,
    pub archived_room: Option<ArchivedRoomSummary>,
}

impl TryFrom<RoomUpdate> for Mutation {
    type Error = AppErr;

    fn try_from(u: RoomUpdate) -> Result<Self, AppErr> {
        match u.action {
            UpdateAction::Upsert => u.room
                .map(Mutation::Upsert)
                .ok_or_else(|| bad("upsert requires `room`")),
            UpdateAction::Delete => u.room_id
                .or_else(|| u.room.map(|r| r.id))
                .map(Mutation::Delete)
                .ok_or_else(|| bad("delete requires `roomId`")),
            UpdateAction::Archive => u.archived_room
                .map(Mutation::Archive)
                .ok_or_else(|| bad("archive requires `archivedRoom`")),
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
