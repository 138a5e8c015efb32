use serde::Deserialize;

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub log: LogSettings,
}

/// Where the HTTP/WebSocket listener binds.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Delivery tuning for subscriber connections and the publish endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    /// Outbound queue depth per subscriber. A full queue marks the subscriber as stalled.
    pub channel_capacity: usize,
    /// Upper bound for a single socket write before the session is dropped.
    pub send_timeout_ms: u64,
    /// Keepalive ping period. `0` disables pings.
    pub ping_interval_secs: u64,
    /// Largest accepted publish body.
    pub max_payload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Anything left out is filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub channel_capacity: Option<usize>,
    pub send_timeout_ms: Option<u64>,
    pub ping_interval_secs: Option<u64>,
    pub max_payload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            relay: RelaySettings {
                channel_capacity: 64,
                send_timeout_ms: 10_000,
                ping_interval_secs: 30,
                max_payload_bytes: 1024 * 1024,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server;
        let relay = partial.relay;
        let log = partial.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            relay: RelaySettings {
                channel_capacity: relay
                    .as_ref()
                    .and_then(|r| r.channel_capacity)
                    .unwrap_or(default.relay.channel_capacity),
                send_timeout_ms: relay
                    .as_ref()
                    .and_then(|r| r.send_timeout_ms)
                    .unwrap_or(default.relay.send_timeout_ms),
                ping_interval_secs: relay
                    .as_ref()
                    .and_then(|r| r.ping_interval_secs)
                    .unwrap_or(default.relay.ping_interval_secs),
                max_payload_bytes: relay
                    .as_ref()
                    .and_then(|r| r.max_payload_bytes)
                    .unwrap_or(default.relay.max_payload_bytes),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}
