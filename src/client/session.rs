//! Per-socket session guard.
//!
//! Drives one subscriber through `Connecting -> Open -> Closed`. Closing is
//! tied to `Drop`, so the relay forgets the connection exactly once however
//! the socket task ends.

use std::sync::Arc;

use tracing::debug;

use crate::client::connection::{Connection, ConnectionId, ConnectionState};
use crate::relay::Relay;

pub struct Session {
    relay: Arc<Relay>,
    id: Option<ConnectionId>,
    state: ConnectionState,
}

impl Session {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            id: None,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn id(&self) -> Option<&ConnectionId> {
        self.id.as_ref()
    }

    /// Registers the connection, which also replays the current state to it.
    pub fn open(&mut self, connection: Connection) {
        if !self.state.can_transition_to(ConnectionState::Open) {
            debug!("ignoring open for session in state {:?}", self.state);
            return;
        }
        self.id = Some(connection.id.clone());
        self.relay.connect(connection);
        self.state = ConnectionState::Open;
    }

    pub fn close(&mut self) {
        if !self.state.can_transition_to(ConnectionState::Closed) {
            return;
        }
        if let Some(id) = self.id.as_ref() {
            self.relay.disconnect(id);
        }
        self.state = ConnectionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
