//! CLI for listsync
//!
//! Subcommands:
//! - `server`: run the relay
//! - `subscribe`: connect as a subscriber and print every pushed snapshot
//! - `publish`: POST a snapshot to a running relay

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use listsync::config::load_config;
use listsync::relay::Relay;
use listsync::transport::{self, AppState};
use listsync::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "listsync")]
enum Command {
    /// Start the relay server
    Server,
    /// Connect as a subscriber and print each snapshot pushed by the relay
    Subscribe {
        /// WebSocket URL of the relay
        #[arg(long, default_value = "ws://127.0.0.1:3000/")]
        url: String,
    },
    /// Publish a snapshot to the relay
    Publish {
        /// Publish endpoint of the relay
        #[arg(long, default_value = "http://127.0.0.1:3000/sync")]
        url: String,
        /// JSON snapshot given inline
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,
        /// File holding the JSON snapshot
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Subscribe { url } => {
            logging::init("info");
            run_subscriber(&url).await
        }
        Command::Publish { url, data, file } => {
            logging::init("info");
            run_publisher(&url, data, file).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&config.log.level);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let state = AppState {
        relay: Arc::new(Relay::new()),
        settings: Arc::new(config),
    };

    transport::serve(listener, state).await?;
    info!("Relay stopped");
    Ok(())
}

async fn run_subscriber(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::StreamExt;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;
    info!("Subscribed to {url}");

    while let Some(msg) = ws_stream.next().await {
        match msg? {
            WsMessage::Text(text) => println!("{}", text.as_str()),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Relay closed the connection");
    Ok(())
}

async fn run_publisher(
    url: &str,
    data: Option<String>,
    file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = match (data, file) {
        (Some(data), _) => data,
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => return Err("either --data or --file is required".into()),
    };

    let response = reqwest::Client::new()
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(format!("relay answered {status}: {text}").into());
    }

    println!("{text}");
    Ok(())
}
