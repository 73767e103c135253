use std::collections::{HashMap, HashSet};

use crate::state::{ArchivedRoomSummary, RoomSummary};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("room {0} has already ended")]
pub struct AlreadyArchived(pub String);

#[derive(Debug)]
pub struct RoomTable {
    active:       HashMap<String, RoomSummary>,
    archived:     Vec<ArchivedRoomSummary>,
    max_archived: usize,
}

impl RoomTable {
    pub fn new(max_archived: usize) -> Self {
        Self { active: HashMap::new(), archived: Vec::new(), max_archived }
    }

    pub fn hydrate(
        rooms: Vec<RoomSummary>,
        archived: Vec<ArchivedRoomSummary>,
        max_archived: usize,
    ) -> Self {
        let mut table = Self::new(max_archived);
        for r in rooms {
            if !archived.iter().any(|a| a.id == r.id) {
                table.active.insert(r.id.clone(), r);
            }
        }
        // stored newest first; replay oldest first to rebuild insertion order
        for a in archived.into_iter().rev() {
            table.archived.retain(|x| x.id != a.id);
            table.archived.push(a);
        }
        table.trim_archived();
        table
    }

    pub fn upsert(&mut self, room: RoomSummary) -> Result<(), AlreadyArchived> {
        if self.is_archived(&room.id) {
            return Err(AlreadyArchived(room.id));
        }
        self.active.insert(room.id.clone(), room);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.active.remove(id).is_some()
    }

    pub fn archive(&mut self, summary: ArchivedRoomSummary) -> Vec<String> {
        self.active.remove(&summary.id);
        self.archived.retain(|x| x.id != summary.id);
        self.archived.push(summary);
        self.trim_archived()
    }

    fn trim_archived(&mut self) -> Vec<String> {
        if self.archived.len() <= self.max_archived {
            return Vec::new();
        }
        let doomed: HashSet<usize> = self.newest_first()[self.max_archived..].iter().copied().collect();
        let mut evicted = Vec::new();
        let mut idx = 0;
        self.archived.retain(|a| {
            let keep = !doomed.contains(&idx);
            idx += 1;
            if !keep { evicted.push(a.id.clone()); }
            keep
        });
        evicted
    }

    // `archived` is in insertion order; on equal `endedAt` the later insert ranks newer
    fn newest_first(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.archived.len()).collect();
        order.sort_by(|&i, &j| {
            self.archived[j].ended_at.cmp(&self.archived[i].ended_at).then(j.cmp(&i))
        });
        order
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    pub fn is_archived(&self, id: &str) -> bool {
        self.archived.iter().any(|a| a.id == id)
    }

    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<_> = self.active.values().cloned().collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rooms
    }

    pub fn list_public(&self) -> Vec<RoomSummary> {
        self.list().into_iter().filter(RoomSummary::is_public).collect()
    }

    pub fn list_archived(&self) -> Vec<ArchivedRoomSummary> {
        self.newest_first().into_iter().map(|i| self.archived[i].clone()).collect()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.list().into_iter().map(|r| r.id).collect()
    }
}
