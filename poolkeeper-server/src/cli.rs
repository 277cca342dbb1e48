use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8046";

#[derive(Parser)]
#[command(
    name = "poolkeeper",
    about = "Poolkeeper Server - scheduled refresh coordinator for account pools",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true, env = "POOLKEEPER_DATA_DIR", help = "Data directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, env = "POOLKEEPER_LOG_DIR", help = "Write JSON logs here")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the admin server and scheduler (default if no command specified)")]
    Serve {
        #[arg(long, env = "POOLKEEPER_HOST", help = "Override the configured bind host")]
        host: Option<String>,

        #[arg(short, long, env = "POOLKEEPER_PORT", help = "Override the configured port")]
        port: Option<u16>,
    },

    #[command(about = "Show scheduled refresh state from a running server")]
    States {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,

        #[arg(long, env = "POOLKEEPER_URL", default_value = DEFAULT_SERVER_URL)]
        url: String,
    },

    #[command(about = "Refresh accounts now on a running server")]
    Refresh {
        #[arg(required = true, help = "Account IDs to refresh")]
        account_ids: Vec<String>,

        #[arg(long, env = "POOLKEEPER_URL", default_value = DEFAULT_SERVER_URL)]
        url: String,
    },

    #[command(about = "Validate config.json and print the effective settings")]
    CheckConfig,
}
