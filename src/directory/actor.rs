use std::sync::Arc;

use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::info;

use super::{
    sessions::{Outbox, Role, SessionId},
    AdminStatus, Directory,
};
use crate::{
    error::{AppErr, AppResult},
    simulator::RoomSimulator,
    state::{ArchivedRoomSummary, Mutation, RoomSummary},
};

const QUEUE_DEPTH: usize = 256;

enum Command {
    Connect { role: Role, outbox: Outbox, reply: oneshot::Sender<SessionId> },
    Disconnect { session: SessionId },
    ClientText { session: SessionId, text: String },
    Apply { mutation: Mutation, reply: oneshot::Sender<AppResult<()>> },
    ListRooms { include_private: bool, reply: oneshot::Sender<Vec<RoomSummary>> },
    ListArchived { reply: oneshot::Sender<Vec<ArchivedRoomSummary>> },
    AdminStatus { reply: oneshot::Sender<AdminStatus> },
    HasRoom { room_id: String, reply: oneshot::Sender<bool> },
    IsPolling { reply: oneshot::Sender<bool> },
}

enum Event {
    Command(Command),
    Tick,
}

#[derive(Clone)]
pub struct DirectoryHandle {
    tx:        mpsc::Sender<Command>,
    simulator: Arc<dyn RoomSimulator>,
}

pub fn spawn(directory: Directory) -> (DirectoryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let simulator = directory.simulator.clone();
    let task = tokio::spawn(run(directory, rx));
    (DirectoryHandle { tx, simulator }, task)
}

async fn run(mut dir: Directory, mut rx: mpsc::Receiver<Command>) {
    loop {
        let event = tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => Event::Command(cmd),
                None => break,
            },
            _ = dir.scheduler.tick() => Event::Tick,
        };
        match event {
            Event::Tick => dir.poll().await,
            Event::Command(cmd) => handle(&mut dir, cmd).await,
        }
    }
    dir.scheduler.stop();
    info!("room directory stopped");
}

async fn handle(dir: &mut Directory, cmd: Command) {
    match cmd {
        Command::Connect { role, outbox, reply } => {
            let id = dir.connect(role, outbox).await;
            let _ = reply.send(id);
        }
        Command::Disconnect { session } => dir.disconnect(session).await,
        Command::ClientText { session, text } => dir.on_client_text(session, &text).await,
        Command::Apply { mutation, reply } => {
            let _ = reply.send(dir.apply(mutation).await);
        }
        Command::ListRooms { include_private, reply } => {
            let _ = reply.send(if include_private { dir.list() } else { dir.list_public() });
        }
        Command::ListArchived { reply } => { let _ = reply.send(dir.list_archived()); }
        Command::AdminStatus { reply } => { let _ = reply.send(dir.admin_status()); }
        Command::HasRoom { room_id, reply } => { let _ = reply.send(dir.contains(&room_id)); }
        Command::IsPolling { reply } => { let _ = reply.send(dir.is_polling()); }
    }
}

impl DirectoryHandle {
    async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> AppResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| AppErr::Unavailable)?;
        rx.await.map_err(|_| AppErr::Unavailable)
    }

    async fn tell(&self, cmd: Command) {
        // a stopped directory has nobody left to notify
        let _ = self.tx.send(cmd).await;
    }

    pub async fn connect(&self, role: Role, outbox: Outbox) -> AppResult<SessionId> {
        self.ask(|reply| Command::Connect { role, outbox, reply }).await
    }

    pub async fn disconnect(&self, session: SessionId) {
        self.tell(Command::Disconnect { session }).await
    }

    pub async fn client_text(&self, session: SessionId, text: String) {
        self.tell(Command::ClientText { session, text }).await
    }

    pub async fn apply(&self, mutation: Mutation) -> AppResult<()> {
        self.ask(|reply| Command::Apply { mutation, reply }).await?
    }

    pub async fn upsert(&self, room: RoomSummary) -> AppResult<()> {
        self.apply(Mutation::Upsert(room)).await
    }

    pub async fn delete(&self, room_id: impl Into<String>) -> AppResult<()> {
        self.apply(Mutation::Delete(room_id.into())).await
    }

    pub async fn archive(&self, summary: ArchivedRoomSummary) -> AppResult<()> {
        self.apply(Mutation::Archive(summary)).await
    }

    pub async fn list(&self) -> AppResult<Vec<RoomSummary>> {
        self.ask(|reply| Command::ListRooms { include_private: true, reply }).await
    }

    pub async fn list_public(&self) -> AppResult<Vec<RoomSummary>> {
        self.ask(|reply| Command::ListRooms { include_private: false, reply }).await
    }

    pub async fn list_archived(&self) -> AppResult<Vec<ArchivedRoomSummary>> {
        self.ask(|reply| Command::ListArchived { reply }).await
    }

    pub async fn admin_status(&self) -> AppResult<AdminStatus> {
        self.ask(|reply| Command::AdminStatus { reply }).await
    }

    pub async fn is_polling(&self) -> AppResult<bool> {
        self.ask(|reply| Command::IsPolling { reply }).await
    }

    pub async fn room_status(&self, room_id: &str) -> AppResult<Value> {
        let room = room_id.to_string();
        if !self.ask(|reply| Command::HasRoom { room_id: room, reply }).await? {
            return Err(AppErr::NotFound(format!("room {room_id}")));
        }
        Ok(self.simulator.status(room_id).await?)
    }
}
