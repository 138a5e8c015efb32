//! Subscriber connection handle
//!
//! `Connection` is what the broadcaster keeps for every open subscriber: an
//! id and the sending half of that subscriber's bounded outbound queue. The
//! receiving half belongs to the socket writer task, so once the writer is
//! gone the queue reports itself closed and the connection is no longer
//! writable.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::relay::Payload;

pub type ConnectionId = String;

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: Sender<Payload>,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(sender: Sender<Payload>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            connected_at: Utc::now(),
        }
    }

    /// Whether the writer side is still draining this connection's queue.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Enqueue without waiting. A full queue is reported, never awaited.
    pub fn try_push(&self, payload: Payload) -> Result<(), TrySendError<Payload>> {
        self.sender.try_send(payload)
    }
}

/// Lifecycle of a subscriber session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade accepted, not yet registered with the relay.
    Connecting,
    /// Registered; receives replay and broadcasts.
    Open,
    /// Removed from the relay. Terminal.
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Connecting, ConnectionState::Open)
                | (ConnectionState::Connecting, ConnectionState::Closed)
                | (ConnectionState::Open, ConnectionState::Closed)
        )
    }
}
