use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerMessage;

pub const OUTBOX_DEPTH: usize = 100;

pub type Outbox = mpsc::Sender<String>;

pub fn outbox() -> (Outbox, mpsc::Receiver<String>) {
    mpsc::channel(OUTBOX_DEPTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for SessionId {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Lobby,
    Admin,
}

struct Session {
    role:   Role,
    outbox: Outbox,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn register(&mut self, role: Role, outbox: Outbox) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(id, Session { role, outbox });
        id
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Role> {
        self.sessions.remove(&id).map(|s| s.role)
    }

    pub fn role(&self, id: SessionId) -> Option<Role> {
        self.sessions.get(&id).map(|s| s.role)
    }

    pub fn count(&self, role: Role) -> usize {
        self.sessions.values().filter(|s| s.role == role).count()
    }

    pub fn send_to(&self, id: SessionId, msg: &ServerMessage) -> bool {
        match self.sessions.get(&id) {
            Some(s) => deliver(id, &s.outbox, msg.to_text()),
            None => false,
        }
    }

    pub fn broadcast(&self, role: Role, msg: &ServerMessage) -> usize {
        let mut targets = self.sessions.iter().filter(|(_, s)| s.role == role).peekable();
        if targets.peek().is_none() {
            return 0;
        }
        let text = msg.to_text();
        targets.filter(|(id, s)| deliver(**id, &s.outbox, text.clone())).count()
    }
}

// never waits: a full queue means the client stopped reading, so it just lags
fn deliver(id: SessionId, outbox: &Outbox, text: String) -> bool {
    match outbox.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(session = %id, "outbox full, dropping message for slow socket");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(session = %id, "dropping message for closed socket");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> ServerMessage {
        ServerMessage::Rooms { rooms: vec![] }
    }

    #[test]
    fn broadcast_only_reaches_matching_role() {
        let mut reg = SessionRegistry::default();
        let (ltx, mut lrx) = outbox();
        let (atx, mut arx) = outbox();
        reg.register(Role::Lobby, ltx);
        reg.register(Role::Admin, atx);

        assert_eq!(reg.broadcast(Role::Lobby, &msg()), 1);
        assert!(lrx.try_recv().is_ok());
        assert!(arx.try_recv().is_err());
    }

    #[test]
    fn dead_socket_does_not_block_the_rest() {
        let mut reg = SessionRegistry::default();
        let (dead, dead_rx) = outbox();
        let (live, mut live_rx) = outbox();
        reg.register(Role::Lobby, dead);
        reg.register(Role::Lobby, live);
        drop(dead_rx);

        assert_eq!(reg.broadcast(Role::Lobby, &msg()), 1);
        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn stalled_socket_is_capped_and_does_not_block_the_rest() {
        let mut reg = SessionRegistry::default();
        let (stalled, mut stalled_rx) = outbox();
        let (live, mut live_rx) = outbox();
        reg.register(Role::Admin, stalled);
        reg.register(Role::Admin, live);

        for _ in 0..OUTBOX_DEPTH {
            assert_eq!(reg.broadcast(Role::Admin, &msg()), 2);
            assert!(live_rx.try_recv().is_ok());
        }
        assert_eq!(reg.broadcast(Role::Admin, &msg()), 1);
        assert!(live_rx.try_recv().is_ok());

        let mut queued = 0;
        while stalled_rx.try_recv().is_ok() { queued += 1; }
        assert_eq!(queued, OUTBOX_DEPTH);
        assert_eq!(reg.broadcast(Role::Admin, &msg()), 2);
    }

    #[test]
    fn remove_reports_role_and_updates_counts() {
        let mut reg = SessionRegistry::default();
        let (tx, _rx) = outbox();
        let id = reg.register(Role::Admin, tx);
        assert_eq!(reg.count(Role::Admin), 1);
        assert_eq!(reg.remove(id), Some(Role::Admin));
        assert_eq!(reg.remove(id), None);
        assert_eq!(reg.count(Role::Admin), 0);
        assert!(!reg.send_to(id, &msg()));
    }
}
