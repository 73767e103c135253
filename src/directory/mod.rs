// 單一任務擁有全部狀態：指令與計時器逐一處理，不需要鎖
mod actor;
pub mod poller;
pub mod rooms;
pub mod sessions;

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    protocol::{ClientMessage, ServerMessage},
    simulator::RoomSimulator,
    state::{now_millis, ArchivedRoomSummary, Mutation, RoomSummary},
    store::{KvStore, ARCHIVED_KEY, ROOMS_KEY},
};
use poller::{PollPlan, Scheduler, Subscriptions};
use rooms::RoomTable;
use sessions::{Outbox, Role, SessionId, SessionRegistry};

pub use actor::{spawn, DirectoryHandle};

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub poll_interval: Duration,
    pub max_archived:  usize,
}

impl From<&Config> for Settings {
    fn from(c: &Config) -> Self {
        Self { poll_interval: c.poll_interval, max_archived: c.max_archived }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub rooms:             Vec<RoomSummary>,
    pub archived_rooms:    Vec<ArchivedRoomSummary>,
    pub connected_clients: usize,
}

pub struct Directory {
    table:     RoomTable,
    store:     KvStore,
    sessions:  SessionRegistry,
    subs:      Subscriptions,
    scheduler: Scheduler,
    simulator: Arc<dyn RoomSimulator>,
    settings:  Settings,
}

impl Directory {
    pub async fn load(
        store: KvStore,
        simulator: Arc<dyn RoomSimulator>,
        settings: Settings,
    ) -> AppResult<Self> {
        let rooms: Vec<RoomSummary> = store.get_json(ROOMS_KEY).await?.unwrap_or_default();
        let archived: Vec<ArchivedRoomSummary> = store.get_json(ARCHIVED_KEY).await?.unwrap_or_default();
        let table = RoomTable::hydrate(rooms, archived, settings.max_archived);
        info!(
            active = table.active_ids().len(),
            archived = table.list_archived().len(),
            "room directory hydrated"
        );
        Ok(Self {
            table,
            store,
            sessions: SessionRegistry::default(),
            subs: Subscriptions::default(),
            scheduler: Scheduler::default(),
            simulator,
            settings,
        })
    }

    /* ---------------- 房間變更 ---------------- */

    // 順序：記憶體 → 持久化 → 廣播
    pub async fn apply(&mut self, mutation: Mutation) -> AppResult<()> {
        let room_id = mutation.room_id().to_string();
        let archived_changed = match mutation {
            Mutation::Upsert(room) => {
                self.table.upsert(room).map_err(|e| AppErr::Conflict(e.to_string()))?;
                info!(room = %room_id, "room upserted");
                false
            }
            Mutation::Delete(id) => {
                if self.table.delete(&id) {
                    info!(room = %id, "room deleted");
                } else {
                    debug!(room = %id, "delete for unknown room");
                }
                self.forget_room(&id);
                false
            }
            Mutation::Archive(summary) => {
                let id = summary.id.clone();
                let evicted = self.table.archive(summary);
                info!(room = %id, evicted = evicted.len(), "room archived");
                self.forget_room(&id);
                true
            }
        };

        self.persist(archived_changed).await;
        self.broadcast_rooms(archived_changed).await;
        Ok(())
    }

    fn forget_room(&mut self, id: &str) {
        if self.subs.rooms.remove(id) {
            self.reconcile_polling();
        }
    }

    async fn persist(&self, archived_changed: bool) {
        let mut docs = Vec::with_capacity(2);
        match serde_json::to_string(&self.table.list()) {
            Ok(raw) => docs.push((ROOMS_KEY, raw)),
            Err(e) => warn!(error = %e, "failed to encode active rooms"),
        }
        if archived_changed {
            match serde_json::to_string(&self.table.list_archived()) {
                Ok(raw) => docs.push((ARCHIVED_KEY, raw)),
                Err(e) => warn!(error = %e, "failed to encode archived rooms"),
            }
        }
        if let Err(e) = self.store.put_many(&docs).await {
            warn!(error = %e, "persisting room directory failed; serving from memory");
        }
    }

    async fn broadcast_rooms(&self, archived_changed: bool) {
        self.sessions.broadcast(Role::Lobby, &ServerMessage::Rooms { rooms: self.table.list_public() });
        if archived_changed {
            self.sessions.broadcast(
                Role::Lobby,
                &ServerMessage::ArchivedRooms { rooms: self.table.list_archived() },
            );
        }
        self.broadcast_admin_rooms().await;
    }

    async fn broadcast_admin_rooms(&self) {
        if self.sessions.count(Role::Admin) == 0 {
            return;
        }
        let snapshot = self.admin_snapshot().await;
        self.sessions.broadcast(Role::Admin, &snapshot);
    }

    async fn admin_snapshot(&self) -> ServerMessage {
        let kv_key_count = self.store.key_count().await.unwrap_or_else(|e| {
            warn!(error = %e, "counting store keys failed");
            0
        });
        ServerMessage::AdminRooms {
            rooms:          self.table.list(),
            archived_rooms: self.table.list_archived(),
            lobby_clients:  self.sessions.count(Role::Lobby),
            kv_key_count,
            fetched_at:     now_millis(),
        }
    }

    /* ---------------- 連線 ---------------- */

    pub async fn connect(&mut self, role: Role, outbox: Outbox) -> SessionId {
        let id = self.sessions.register(role, outbox);
        debug!(session = %id, ?role, "session connected");
        match role {
            Role::Lobby => {
                self.sessions.send_to(id, &ServerMessage::Rooms { rooms: self.table.list_public() });
                self.sessions.send_to(id, &ServerMessage::ArchivedRooms { rooms: self.table.list_archived() });
                self.broadcast_admin_rooms().await;
            }
            Role::Admin => {
                let snapshot = self.admin_snapshot().await;
                self.sessions.send_to(id, &snapshot);
            }
        }
        self.reconcile_polling();
        id
    }

    pub async fn disconnect(&mut self, id: SessionId) {
        let Some(role) = self.sessions.remove(id) else { return };
        debug!(session = %id, ?role, "session disconnected");
        if role == Role::Lobby {
            self.broadcast_admin_rooms().await;
        }
        self.reconcile_polling();
    }

    pub async fn on_client_text(&mut self, id: SessionId, raw: &str) {
        if self.sessions.role(id) != Some(Role::Admin) {
            debug!(session = %id, "ignoring message from non-admin session");
            return;
        }
        let Some(msg) = ClientMessage::parse(raw) else {
            debug!(session = %id, "dropping malformed admin message");
            return;
        };
        match msg {
            ClientMessage::SubscribeAll => self.subs.all = true,
            ClientMessage::UnsubscribeAll => self.subs.all = false,
            ClientMessage::SubscribeRoom { room_id } => { self.subs.rooms.insert(room_id); }
            ClientMessage::UnsubscribeRoom { room_id } => { self.subs.rooms.remove(&room_id); }
            ClientMessage::Refresh => {
                let snapshot = self.admin_snapshot().await;
                self.sessions.send_to(id, &snapshot);
            }
        }
        self.reconcile_polling();
    }

    /* ---------------- 輪詢 ---------------- */

    // polls iff an admin is connected and something is subscribed
    fn reconcile_polling(&mut self) {
        if self.sessions.count(Role::Admin) == 0 {
            self.subs.clear();
        }
        if self.subs.is_empty() {
            if self.scheduler.stop() {
                debug!("admin polling stopped");
            }
        } else if self.scheduler.start(self.settings.poll_interval) {
            debug!(interval_ms = self.settings.poll_interval.as_millis() as u64, "admin polling started");
        }
    }

    pub async fn poll(&mut self) {
        let Some(plan) = poller::plan(&self.subs, self.table.active_ids()) else { return };
        match plan {
            PollPlan::All(ids) => {
                let results = poller::fetch_batch(self.simulator.as_ref(), &ids).await;
                let msg = ServerMessage::AdminAllDetails {
                    details:    results.into_iter().collect(),
                    fetched_at: now_millis(),
                };
                self.sessions.broadcast(Role::Admin, &msg);
            }
            PollPlan::Rooms(ids) => {
                let results = poller::fetch_batch(self.simulator.as_ref(), &ids).await;
                let fetched_at = now_millis();
                for (room_id, result) in results {
                    let msg = match poller::split(result) {
                        Ok(detail) => ServerMessage::RoomDetail { room_id, detail, fetched_at },
                        Err(error) => ServerMessage::RoomDetailError { room_id, error },
                    };
                    self.sessions.broadcast(Role::Admin, &msg);
                }
            }
        }
    }

    /* ---------------- 查詢 ---------------- */

    pub fn list(&self) -> Vec<RoomSummary> { self.table.list() }

    pub fn list_public(&self) -> Vec<RoomSummary> { self.table.list_public() }

    pub fn list_archived(&self) -> Vec<ArchivedRoomSummary> { self.table.list_archived() }

    pub fn contains(&self, id: &str) -> bool { self.table.contains(id) }

    pub fn admin_status(&self) -> AdminStatus {
        AdminStatus {
            rooms:             self.table.list(),
            archived_rooms:    self.table.list_archived(),
            connected_clients: self.sessions.count(Role::Lobby),
        }
    }

    pub fn is_polling(&self) -> bool { self.scheduler.is_running() }
}
