mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use fedi::commands;
use fedi::config::Config;
use fedi::daemon_log::{self, daemon_log};
use fedi::paths;
use fedi::rpc::daemon_service::DaemonServiceClient;
use fedi::rpc::{call_context, StatusDraft};
use fedi::session_daemon::{bootstrap, run_daemon, Connector, ProcessSpawner};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => paths::default_config_dir()?,
    };
    daemon_log::init(&config_dir);
    let mut config = Config::load_or_init(&config_dir)?;

    match cli.command {
        Command::Daemon {
            no_idle_timeout,
            idle_timeout,
        } => {
            // CLI flags override config
            if no_idle_timeout {
                config.server.without_idle_timeout = true;
            }
            if let Some(secs) = idle_timeout {
                config.server.without_idle_timeout = false;
                config.server.idle_timeout_secs = secs;
            }
            let mode = config.server.run_mode();
            run_daemon(&config_dir, &config, mode).await
        }
        Command::DaemonStatus => daemon_status(&config).await,
        command => run_attached(&config_dir, &config, command).await,
    }
}

/// Reports on an existing daemon. Never starts one.
async fn daemon_status(config: &Config) -> Result<()> {
    let socket_path = config.socket_path()?;
    if !socket_path.exists() {
        println!("No daemon running (socket: {})", socket_path.display());
        return Ok(());
    }

    let client = bootstrap::connect(&socket_path).await?;
    let info = client.daemon_info(call_context()).await?;
    println!("{}", commands::format_daemon_info(&info));
    Ok(())
}

/// Runs one command inside a daemon session, ending the session on every path.
async fn run_attached(config_dir: &Path, config: &Config, command: Command) -> Result<()> {
    let spawner = ProcessSpawner::current(config_dir)?;
    let connector = Connector::new(config.socket_path()?, spawner)
        .with_session_tracking(config.server.tracks_sessions());
    let session = connector.connect().await?;

    let result = dispatch(session.client(), command).await;

    let ended = session.end().await;
    if let Err(e) = &ended {
        daemon_log("cli", &format!("Session end failed: {:#}", e));
    }
    result.and(ended)
}

async fn dispatch(client: &DaemonServiceClient, command: Command) -> Result<()> {
    match command {
        Command::Login { instance, token } => {
            let account = commands::login(client, instance, token).await?;
            println!("Logged in as @{} ({})", account.acct, account.id);
        }
        Command::Whoami => {
            let account = commands::whoami(client).await?;
            println!("{}", commands::format_account(&account));
        }
        Command::ShowAccount { id } => {
            let account = commands::show_account(client, id).await?;
            println!("{}", commands::format_account(&account));
        }
        Command::Post {
            text,
            visibility,
            spoiler,
            sensitive,
        } => {
            let draft = StatusDraft {
                text,
                visibility,
                spoiler_text: spoiler,
                sensitive,
            };
            let status = commands::post(client, draft).await?;
            println!("{}", commands::format_status(&status));
        }
        Command::Daemon { .. } | Command::DaemonStatus => {
            anyhow::bail!("command does not run inside a session")
        }
    }
    Ok(())
}
