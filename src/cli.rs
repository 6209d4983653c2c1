use clap::{Parser, Subcommand};
use fedi::rpc::Visibility;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fedi")]
#[command(about = "Fediverse client backed by a shared per-user daemon")]
#[command(version)]
pub struct Cli {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground (used by connect-or-spawn)
    Daemon {
        /// Keep running until signalled; disables session tracking
        #[arg(long)]
        no_idle_timeout: bool,

        /// Exit after this many seconds without a new connection (min 60)
        #[arg(long, conflicts_with = "no_idle_timeout")]
        idle_timeout: Option<u64>,
    },

    /// Show the running daemon, if any
    DaemonStatus,

    /// Store credentials for an instance and verify them
    Login {
        #[arg(long)]
        instance: String,

        #[arg(long)]
        token: String,
    },

    /// Show the logged-in account
    Whoami,

    /// Show an account by ID
    ShowAccount { id: String },

    /// Publish a status
    Post {
        text: String,

        #[arg(long, default_value_t = Visibility::Public)]
        visibility: Visibility,

        /// Content warning shown before the text
        #[arg(long)]
        spoiler: Option<String>,

        #[arg(long)]
        sensitive: bool,
    },
}
