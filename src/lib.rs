//! # listsync
//!
//! `listsync` is a real-time list-synchronization relay. A publisher POSTs
//! the full shopping-list state to `/sync`; the relay keeps that latest
//! snapshot and pushes it over WebSockets to every connected client. Clients
//! that join later get the current snapshot as soon as they connect.
//!
//! The payload is opaque: the relay checks that it is JSON and otherwise
//! never looks inside.
//!
//! ## Core Modules
//!
//! - `relay`: the retained state slot, the connection broadcaster and the `Relay` hub.
//! - `client`: a subscriber connection handle and its session lifecycle.
//! - `transport`: the axum HTTP/WebSocket server.
//! - `config`: layered configuration loading.
//! - `utils`: error type and logging setup.

pub mod client;
pub mod config;
pub mod relay;
pub mod transport;
pub mod utils;
