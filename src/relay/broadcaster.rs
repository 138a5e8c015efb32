//! Connection broadcaster
//!
//! Owns the set of open subscriber connections and fans payloads out to them.
//!
//! Concurrency notes:
//! - The connection set sits behind its own mutex. `broadcast` copies the
//!   membership and releases the lock before pushing, so the set can change
//!   while a fan-out is in flight.
//! - Pushing is `try_send` into each connection's bounded queue. A stalled
//!   subscriber gets its push dropped instead of holding up the others.
//! - `broadcast` never removes members. Closed connections are skipped and
//!   left for their own `on_disconnect`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::client::{Connection, ConnectionId};
use crate::relay::payload::Payload;
use crate::relay::slot::StateSlot;

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Pushes that were enqueued.
    pub delivered: usize,
    /// Members whose queue was already closed.
    pub skipped_closed: usize,
    /// Members whose queue was full.
    pub stalled: usize,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `connection` and replays the current state to it.
    ///
    /// The replay is enqueued while the set is still locked. A concurrent
    /// broadcast therefore either misses this connection (and the replay
    /// already carries the newer state) or lands behind the replay.
    pub fn on_connect(&self, connection: Connection, slot: &StateSlot) {
        let mut connections = self.connections();
        if let Some(payload) = slot.get() {
            push(&connection, payload);
        }
        connections.insert(connection.id.clone(), connection);
    }

    /// Forgets a connection. Unknown ids are a no-op.
    pub fn on_disconnect(&self, id: &ConnectionId) -> bool {
        self.connections().remove(id).is_some()
    }

    /// Pushes `payload` once to every member that is open right now.
    pub fn broadcast(&self, payload: &Payload) -> BroadcastReport {
        let members: Vec<Connection> = self.connections().values().cloned().collect();

        let mut report = BroadcastReport::default();
        for connection in &members {
            if !connection.is_open() {
                report.skipped_closed += 1;
                continue;
            }
            match push(connection, payload.clone()) {
                PushOutcome::Enqueued => report.delivered += 1,
                PushOutcome::Closed => report.skipped_closed += 1,
                PushOutcome::Full => report.stalled += 1,
            }
        }
        report
    }

    /// Drops every connection. Their writers see the queue close and hang up.
    pub fn close_all(&self) -> usize {
        let mut connections = self.connections();
        let count = connections.len();
        connections.clear();
        count
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections().is_empty()
    }
}

enum PushOutcome {
    Enqueued,
    Closed,
    Full,
}

fn push(connection: &Connection, payload: Payload) -> PushOutcome {
    match connection.try_push(payload) {
        Ok(()) => PushOutcome::Enqueued,
        Err(TrySendError::Closed(_)) => {
            debug!("Connection {} closed, skipping push", connection.id);
            PushOutcome::Closed
        }
        Err(TrySendError::Full(_)) => {
            warn!("Connection {} is stalled, dropping push", connection.id);
            PushOutcome::Full
        }
    }
}
