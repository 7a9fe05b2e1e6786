use std::sync::Arc;

use clap::Parser;
use tracing::error;

use pollroom::cli::{Cli, Command, StartArgs};
use pollroom::config::ServerConfig;
use pollroom::history::{HistoryStore, JsonlHistory};
use pollroom::room::Room;
use pollroom::{logging, server};

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    match cli.command.unwrap_or_default() {
        Command::Start(args) => {
            if let Err(err) = run(args).await {
                error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        Command::Version => {
            println!("pollroom {}", env!("CARGO_PKG_VERSION"));
        }
    }
}

async fn run(args: StartArgs) -> std::io::Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(client_url) = args.client_url {
        config.client_url = client_url;
    }
    if let Some(history) = args.history {
        config.history_path = history;
    }

    let history: Arc<dyn HistoryStore> = Arc::new(JsonlHistory::new(&config.history_path));
    let room = Room::new(history, config.queue_size);
    server::run(config, room).await
}
