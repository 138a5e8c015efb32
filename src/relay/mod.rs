//! The relay core: one retained payload and the set of subscribers it is
//! pushed to. Nothing here touches the network; the transport layer feeds it
//! connections and publishes.

pub mod broadcaster;
pub mod engine;
pub mod payload;
pub mod slot;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use engine::{PublishReceipt, Relay};
pub use payload::Payload;
pub use slot::{StateSlot, StoredState};

#[cfg(test)]
mod tests;
