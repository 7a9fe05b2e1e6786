//! CLI subcommand definitions.
//!
//! Uses clap derive:
//! - `start` (default) -- run the polling server
//! - `version` -- print build/version info

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Real-time classroom polling server.
#[derive(Parser, Debug)]
#[command(
    name = "pollroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pollroom — live classroom polling over WebSockets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the polling server (default when no subcommand is given).
    Start(StartArgs),

    /// Print version information.
    Version,
}

impl Default for Command {
    fn default() -> Self {
        Self::Start(StartArgs::default())
    }
}

#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Port to listen on (default: $PORT or 5000).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind (default: $POLLROOM_HOST or 0.0.0.0).
    #[arg(long)]
    pub host: Option<std::net::IpAddr>,

    /// Browser origin allowed by CORS (default: $CLIENT_URL or http://localhost:3000).
    #[arg(long)]
    pub client_url: Option<String>,

    /// Poll history file, JSON lines (default: $POLLROOM_HISTORY or data/poll-history.jsonl).
    #[arg(long)]
    pub history: Option<PathBuf>,
}
