// ── Reactive machine store ──
//
// Holds the latest full machine snapshot. Every snapshot replaces the
// previous one wholesale; subscribers are notified through `watch`
// channels only when the content actually changed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::Machine;
use crate::stream::MachineStream;

/// One published snapshot.
pub type Snapshot = Arc<Vec<Arc<Machine>>>;

/// Central store for the machine list.
pub struct MachineStore {
    machines: watch::Sender<Snapshot>,
    last_snapshot: watch::Sender<Option<DateTime<Utc>>>,
}

impl MachineStore {
    pub fn new() -> Self {
        let (machines, _) = watch::channel(Arc::new(Vec::new()));
        let (last_snapshot, _) = watch::channel(None);
        Self {
            machines,
            last_snapshot,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Replace the machine list.
    ///
    /// Returns `true` if subscribers were notified. A snapshot identical to
    /// the current one only refreshes the receipt timestamp.
    pub fn apply_snapshot(&self, machines: Vec<Machine>) -> bool {
        let changed = self.machines.send_if_modified(|current| {
            let identical = current.len() == machines.len()
                && current.iter().zip(&machines).all(|(a, b)| **a == *b);
            if identical {
                return false;
            }
            *current = Arc::new(machines.into_iter().map(Arc::new).collect());
            true
        });
        self.last_snapshot.send_replace(Some(Utc::now()));
        changed
    }

    /// Drop every machine (used on disconnect).
    pub fn clear(&self) {
        self.machines.send_if_modified(|current| {
            if current.is_empty() {
                return false;
            }
            *current = Arc::new(Vec::new());
            true
        });
        self.last_snapshot.send_replace(None);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        self.machines.borrow().clone()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.borrow().len()
    }

    pub fn machine_by_name(&self, name: &str) -> Option<Arc<Machine>> {
        self.machines
            .borrow()
            .iter()
            .find(|m| m.name == name)
            .map(Arc::clone)
    }

    /// When the last snapshot (changed or not) was received.
    pub fn last_snapshot(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> MachineStream {
        MachineStream::new(self.machines.subscribe())
    }

    pub fn subscribe_last_snapshot(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_snapshot.subscribe()
    }
}

impl Default for MachineStore {
    fn default() -> Self {
        Self::new()
    }
}
