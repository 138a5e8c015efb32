use super::{Broadcaster, Payload, Relay, StateSlot};
use crate::client::Connection;
use std::sync::Arc;
use tokio::sync::mpsc;

fn connection(capacity: usize) -> (Connection, mpsc::Receiver<Payload>) {
    let (tx, rx) = mpsc::channel::<Payload>(capacity);
    (Connection::new(tx), rx)
}

#[test]
fn test_slot_starts_empty() {
    let slot = StateSlot::new();
    assert!(slot.get().is_none());
    assert!(slot.snapshot().is_none());
}

#[test]
fn test_slot_last_write_wins() {
    let slot = StateSlot::new();
    assert_eq!(slot.set(Payload::from("{\"a\":1}")), 1);
    assert_eq!(slot.set(Payload::from("{\"a\":2}")), 2);
    assert_eq!(slot.set(Payload::from("{\"a\":3}")), 3);

    assert_eq!(slot.get().unwrap().as_str(), "{\"a\":3}");
    let state = slot.snapshot().unwrap();
    assert_eq!(state.revision, 3);
    assert_eq!(state.payload.as_str(), "{\"a\":3}");
}

#[test]
fn test_payload_from_json_is_compact_and_keeps_key_order() {
    let value: serde_json::Value =
        serde_json::from_str("{ \"lists\" : [ ], \"b\": 1, \"a\": 2 }").unwrap();
    let payload = Payload::from_json(&value);
    assert_eq!(payload.as_str(), "{\"lists\":[],\"b\":1,\"a\":2}");
    assert_eq!(payload.len(), payload.to_string().len());
}

#[test]
fn test_connect_before_publish_receives_nothing() {
    let broadcaster = Broadcaster::new();
    let slot = StateSlot::new();
    let (conn, mut rx) = connection(4);

    broadcaster.on_connect(conn, &slot);

    assert_eq!(broadcaster.len(), 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_connect_after_publish_replays_latest_once() {
    let broadcaster = Broadcaster::new();
    let slot = StateSlot::new();
    slot.set(Payload::from("old"));
    slot.set(Payload::from("new"));
    let (conn, mut rx) = connection(4);

    broadcaster.on_connect(conn, &slot);

    assert_eq!(rx.try_recv().unwrap().as_str(), "new");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_broadcast_reaches_every_open_connection() {
    let broadcaster = Broadcaster::new();
    let slot = StateSlot::new();
    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (conn, rx) = connection(4);
        broadcaster.on_connect(conn, &slot);
        receivers.push(rx);
    }

    let report = broadcaster.broadcast(&Payload::from("hello"));

    assert_eq!(report.delivered, 3);
    assert_eq!(report.skipped_closed, 0);
    for rx in receivers.iter_mut() {
        assert_eq!(rx.try_recv().unwrap().as_str(), "hello");
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn test_broadcast_to_no_connections_is_noop() {
    let broadcaster = Broadcaster::new();
    let report = broadcaster.broadcast(&Payload::from("nobody"));
    assert_eq!(report.delivered, 0);
    assert_eq!(report.skipped_closed, 0);
    assert_eq!(report.stalled, 0);
}

#[test]
fn test_broadcast_skips_closed_connection_without_pruning() {
    let broadcaster = Broadcaster::new();
    let slot = StateSlot::new();
    let (closed, closed_rx) = connection(4);
    let closed_id = closed.id.clone();
    let (open, mut open_rx) = connection(4);
    broadcaster.on_connect(closed, &slot);
    broadcaster.on_connect(open, &slot);

    // Dropping the receiver is what a finished writer task does
    drop(closed_rx);

    let report = broadcaster.broadcast(&Payload::from("still here"));

    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped_closed, 1);
    assert_eq!(open_rx.try_recv().unwrap().as_str(), "still here");
    assert!(broadcaster.contains(&closed_id));
}

#[test]
fn test_broadcast_drops_push_for_stalled_connection() {
    let broadcaster = Broadcaster::new();
    let slot = StateSlot::new();
    let (stalled, mut stalled_rx) = connection(1);
    let (healthy, mut healthy_rx) = connection(4);
    broadcaster.on_connect(stalled, &slot);
    broadcaster.on_connect(healthy, &slot);

    broadcaster.broadcast(&Payload::from("first"));
    let report = broadcaster.broadcast(&Payload::from("second"));

    assert_eq!(report.delivered, 1);
    assert_eq!(report.stalled, 1);
    assert_eq!(stalled_rx.try_recv().unwrap().as_str(), "first");
    assert!(stalled_rx.try_recv().is_err());
    assert_eq!(healthy_rx.try_recv().unwrap().as_str(), "first");
    assert_eq!(healthy_rx.try_recv().unwrap().as_str(), "second");
}

#[test]
fn test_disconnect_is_idempotent() {
    let relay = Relay::new();
    let (conn, _rx) = connection(4);
    let id = conn.id.clone();
    relay.connect(conn);
    assert!(relay.is_connected(&id));

    relay.disconnect(&id);
    assert!(!relay.is_connected(&id));
    assert_eq!(relay.connection_count(), 0);

    relay.disconnect(&id);
    relay.disconnect(&"never-seen".to_string());
    assert_eq!(relay.connection_count(), 0);
}

#[test]
fn test_publish_stores_then_broadcasts() {
    let relay = Relay::new();
    let (conn, mut rx) = connection(4);
    relay.connect(conn);

    let receipt = relay.publish(Payload::from("{\"lists\":[]}"));

    assert_eq!(receipt.revision, 1);
    assert_eq!(receipt.report.delivered, 1);
    assert_eq!(relay.current().unwrap().as_str(), "{\"lists\":[]}");
    assert_eq!(rx.try_recv().unwrap().as_str(), "{\"lists\":[]}");
}

#[test]
fn test_shutdown_closes_all_connections() {
    let relay = Relay::new();
    let (a, mut a_rx) = connection(4);
    let (b, mut b_rx) = connection(4);
    relay.connect(a);
    relay.connect(b);

    relay.shutdown();

    assert_eq!(relay.connection_count(), 0);
    assert!(matches!(
        a_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
    assert!(matches!(
        b_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}

#[test]
fn test_shopping_list_scenario() {
    let relay = Relay::new();

    let (a, mut a_rx) = connection(8);
    let a_id = a.id.clone();
    relay.connect(a);
    assert!(a_rx.try_recv().is_err());

    relay.publish(Payload::from("{\"lists\":[]}"));
    assert_eq!(a_rx.try_recv().unwrap().as_str(), "{\"lists\":[]}");

    let (b, mut b_rx) = connection(8);
    relay.connect(b);
    assert_eq!(b_rx.try_recv().unwrap().as_str(), "{\"lists\":[]}");

    let groceries = "{\"lists\":[{\"name\":\"Groceries\"}]}";
    relay.publish(Payload::from(groceries));
    assert_eq!(a_rx.try_recv().unwrap().as_str(), groceries);
    assert_eq!(b_rx.try_recv().unwrap().as_str(), groceries);
    assert_eq!(relay.current().unwrap().as_str(), groceries);

    relay.disconnect(&a_id);
    drop(a_rx);

    let receipt = relay.publish(Payload::from("{\"lists\":[{\"name\":\"Hardware\"}]}"));
    assert_eq!(receipt.report.delivered, 1);
    assert_eq!(
        b_rx.try_recv().unwrap().as_str(),
        "{\"lists\":[{\"name\":\"Hardware\"}]}"
    );
}

#[test]
fn test_concurrent_publishes_arrive_in_slot_order() {
    let relay = Arc::new(Relay::new());
    let (conn, mut rx) = connection(256);
    relay.connect(conn);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let relay = relay.clone();
            std::thread::spawn(move || {
                for i in 0..16 {
                    relay.publish(Payload::from(format!("{t}-{i}")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut received = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        received.push(payload);
    }

    assert_eq!(received.len(), 128);
    let state = relay.state().unwrap();
    assert_eq!(state.revision, 128);
    // The last push a subscriber saw is exactly what the slot holds
    assert_eq!(received.last().unwrap(), &state.payload);

    // Each publisher's snapshots arrive in the order it published them
    let mut last_seen = [None::<u32>; 8];
    for payload in &received {
        let (t, i) = payload.as_str().split_once('-').unwrap();
        let t: usize = t.parse().unwrap();
        let i: u32 = i.parse().unwrap();
        assert!(
            last_seen[t].is_none_or(|prev| prev < i),
            "publisher {t} went from {:?} to {i}",
            last_seen[t]
        );
        last_seen[t] = Some(i);
    }
    assert!(last_seen.iter().all(|seen| *seen == Some(15)));
}

#[test]
fn test_connect_racing_publishes_never_sees_a_snapshot_twice() {
    let relay = Arc::new(Relay::new());

    let publisher = {
        let relay = relay.clone();
        std::thread::spawn(move || {
            for i in 0..200 {
                relay.publish(Payload::from(i.to_string()));
            }
        })
    };

    let mut receivers = Vec::new();
    for _ in 0..50 {
        let (conn, rx) = connection(512);
        relay.connect(conn);
        receivers.push(rx);
    }
    publisher.join().unwrap();

    for mut rx in receivers {
        let mut previous: Option<u32> = None;
        while let Ok(payload) = rx.try_recv() {
            let current: u32 = payload.as_str().parse().unwrap();
            assert!(
                previous.is_none_or(|prev| prev < current),
                "received {current} after {previous:?}"
            );
            previous = Some(current);
        }
    }
}
