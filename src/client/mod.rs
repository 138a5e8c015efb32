//! The `client` module models a connected subscriber.
//!
//! `Connection` is the handle the broadcaster fans out to, and `Session`
//! walks one socket through its lifecycle against the relay.

pub mod connection;
pub mod session;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use session::Session;
