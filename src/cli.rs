use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zephyr")]
#[command(version)]
#[command(about = "A terminal client for streaming realtime AI chat sessions")]
pub struct Args {
    /// WebSocket host, including scheme (ws:// or wss://)
    #[arg(long)]
    pub host: Option<String>,

    /// Session id to join (generated when omitted)
    #[arg(long, short)]
    pub session: Option<String>,

    /// User id sent with the connection (defaults to "anonymous")
    #[arg(long, short)]
    pub user: Option<String>,

    /// Path to a TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Start without connecting; use /connect later
    #[arg(long)]
    pub no_connect: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Probe the backend's /healthz endpoint before connecting
    #[arg(long)]
    pub check: bool,

    /// Print a freshly generated session id and exit
    #[arg(long)]
    pub generate_session: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "zephyr_client=trace")
    #[arg(long)]
    pub log_level: Option<String>,
}
