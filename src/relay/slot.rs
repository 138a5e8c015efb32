//! State holder
//!
//! A single register with the most recently published payload. Every `set`
//! replaces the value outright: there is no merge and no history. The
//! revision and timestamp are bookkeeping only and never reorder writes.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::relay::payload::Payload;

#[derive(Debug, Clone)]
pub struct StoredState {
    pub payload: Payload,
    /// Count of successful sets, starting at 1.
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct StateSlot {
    inner: RwLock<Option<StoredState>>,
}

impl StateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the held payload and returns its revision.
    pub fn set(&self, payload: Payload) -> u64 {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let revision = slot.as_ref().map_or(1, |s| s.revision + 1);
        *slot = Some(StoredState {
            payload,
            revision,
            updated_at: Utc::now(),
        });
        revision
    }

    pub fn get(&self) -> Option<Payload> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.payload.clone())
    }

    /// Payload together with its bookkeeping.
    pub fn snapshot(&self) -> Option<StoredState> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
