//! Relay engine
//!
//! `Relay` joins the state slot and the broadcaster into the three operations
//! the transport needs: a subscriber connects, a subscriber leaves, a
//! publisher pushes a new snapshot.
//!
//! Publishes are serialized by `publish_lock`, which covers the slot write
//! and the fan-out enqueue. Since fan-out never waits on a socket, the lock is
//! held only briefly, and every subscriber sees snapshots in slot order.
//! `connect` takes the same lock, so a newcomer gets each snapshot once:
//! either through replay or through the next fan-out.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::client::{Connection, ConnectionId};
use crate::relay::broadcaster::{BroadcastReport, Broadcaster};
use crate::relay::payload::Payload;
use crate::relay::slot::{StateSlot, StoredState};

/// What a publish did: which revision it stored and how the fan-out went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub revision: u64,
    pub report: BroadcastReport,
}

#[derive(Debug, Default)]
pub struct Relay {
    slot: StateSlot,
    broadcaster: Broadcaster,
    publish_lock: Mutex<()>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and replays the current state to it, if any.
    pub fn connect(&self, connection: Connection) {
        let id = connection.id.clone();
        {
            let _guard = self.lock_publishes();
            self.broadcaster.on_connect(connection, &self.slot);
        }
        info!(
            "{id} connected ({} open connections)",
            self.broadcaster.len()
        );
    }

    /// Removes a subscriber. Calling it again for the same id does nothing.
    pub fn disconnect(&self, id: &ConnectionId) {
        if self.broadcaster.on_disconnect(id) {
            info!(
                "{id} disconnected ({} open connections)",
                self.broadcaster.len()
            );
        }
    }

    /// Stores `payload` as the current state and fans it out.
    pub fn publish(&self, payload: Payload) -> PublishReceipt {
        let _guard = self.lock_publishes();

        let revision = self.slot.set(payload.clone());
        let report = self.broadcaster.broadcast(&payload);

        info!(
            "Published revision {revision} ({} bytes) to {} connections, {} skipped, {} stalled",
            payload.len(),
            report.delivered,
            report.skipped_closed,
            report.stalled
        );

        PublishReceipt { revision, report }
    }

    fn lock_publishes(&self) -> MutexGuard<'_, ()> {
        self.publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Payload> {
        self.slot.get()
    }

    pub fn state(&self) -> Option<StoredState> {
        self.slot.snapshot()
    }

    pub fn connection_count(&self) -> usize {
        self.broadcaster.len()
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.broadcaster.contains(id)
    }

    /// Closes every subscriber connection. Used on server shutdown.
    pub fn shutdown(&self) {
        let closed = self.broadcaster.close_all();
        info!("Closed {closed} connections");
    }
}
