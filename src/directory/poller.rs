use std::{collections::BTreeSet, time::Duration};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::{protocol::DetailResult, simulator::RoomSimulator};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subscriptions {
    pub all:   bool,
    pub rooms: BTreeSet<String>,
}

impl Subscriptions {
    pub fn is_empty(&self) -> bool {
        !self.all && self.rooms.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollPlan {
    All(Vec<String>),
    Rooms(Vec<String>),
}

pub fn plan(subs: &Subscriptions, active_ids: Vec<String>) -> Option<PollPlan> {
    if subs.all {
        let unique: BTreeSet<String> = active_ids.into_iter().collect();
        Some(PollPlan::All(unique.into_iter().collect()))
    } else if !subs.rooms.is_empty() {
        Some(PollPlan::Rooms(subs.rooms.iter().cloned().collect()))
    } else {
        None
    }
}

pub async fn fetch_batch(sim: &dyn RoomSimulator, ids: &[String]) -> Vec<(String, DetailResult)> {
    let fetches = ids.iter().map(|id| async move {
        let result = match sim.admin_detail(id).await {
            Ok(detail) => DetailResult::Detail(detail),
            Err(e) => {
                tracing::warn!(room = %id, error = %e, "room detail fetch failed");
                DetailResult::Failed { error: e.to_string() }
            }
        };
        (id.clone(), result)
    });
    join_all(fetches).await
}

pub fn split(result: DetailResult) -> Result<Value, String> {
    match result {
        DetailResult::Detail(v) => Ok(v),
        DetailResult::Failed { error } => Err(error),
    }
}

#[derive(Debug, Default)]
pub enum Scheduler {
    #[default]
    Stopped,
    Running(Interval),
}

impl Scheduler {
    pub fn start(&mut self, period: Duration) -> bool {
        if self.is_running() {
            return false;
        }
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *self = Scheduler::Running(interval);
        true
    }

    pub fn stop(&mut self) -> bool {
        matches!(std::mem::take(self), Scheduler::Running(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Scheduler::Running(_))
    }

    // first tick after start is immediate; never resolves while stopped
    pub async fn tick(&mut self) {
        match self {
            Scheduler::Running(interval) => { interval.tick().await; }
            Scheduler::Stopped => std::future::pending::<()>().await,
        }
    }
}
