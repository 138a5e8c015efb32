//! WebSocket transport
//!
//! Every upgraded socket gets:
//! - a `Session` that registers it with the relay (which replays the current
//!   state) and unregisters it when the socket task ends
//! - a writer task draining the connection's bounded queue into the socket,
//!   with a timeout on each write and a periodic keepalive ping
//! - a reader task that discards inbound frames until the peer closes
//!
//! Whichever task finishes first ends the session.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, warn};

use crate::client::{Connection, ConnectionId, Session};
use crate::config::RelaySettings;
use crate::relay::Payload;
use crate::transport::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Payload>(state.settings.relay.channel_capacity.max(1));

    let connection = Connection::new(tx);
    let client_id = connection.id.clone();

    let mut session = Session::new(state.relay.clone());
    session.open(connection);

    let mut writer = tokio::spawn(write_loop(
        ws_sender,
        rx,
        client_id.clone(),
        WriterSettings::from(&state.settings.relay),
    ));
    let mut reader = tokio::spawn(read_loop(ws_receiver, client_id));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    session.close();
}

#[derive(Debug, Clone, Copy)]
struct WriterSettings {
    send_timeout: Duration,
    ping_interval: Option<Duration>,
}

impl From<&RelaySettings> for WriterSettings {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            send_timeout: Duration::from_millis(settings.send_timeout_ms),
            ping_interval: (settings.ping_interval_secs > 0)
                .then(|| Duration::from_secs(settings.ping_interval_secs)),
        }
    }
}

async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Payload>,
    client_id: ConnectionId,
    settings: WriterSettings,
) {
    let mut ping = settings.ping_interval.and_then(|period| {
        let Some(first) = Instant::now().checked_add(period) else {
            warn!("Ping interval {period:?} is out of range, keepalive disabled for {client_id}");
            return None;
        };
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Some(ticker)
    });

    loop {
        let outgoing = tokio::select! {
            next = rx.recv() => match next {
                Some(payload) => Message::Text(payload.to_string().into()),
                None => {
                    // relay dropped this connection, normally on shutdown
                    let _ = timeout(settings.send_timeout, ws_sender.send(Message::Close(None))).await;
                    break;
                }
            },
            _ = next_tick(&mut ping) => Message::Ping(Bytes::new()),
        };

        match timeout(settings.send_timeout, ws_sender.send(outgoing)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Failed to send message to {client_id}: {e}");
                break;
            }
            Err(_) => {
                warn!(
                    "Send to {client_id} timed out after {:?}",
                    settings.send_timeout
                );
                break;
            }
        }
    }

    debug!("Send loop closed for {client_id}");
}

async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn read_loop(mut ws_receiver: SplitStream<WebSocket>, client_id: ConnectionId) {
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                debug!("Ignoring {} byte message from {client_id}", text.as_str().len());
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from {client_id}: {e}");
                break;
            }
        }
    }
}
