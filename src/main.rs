use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    ConfigCommand, DeleteCommand, InsertCommand, SelectCommand, SyncCommand, UpdateCommand,
};
use offsync::{
    Config, Disconnected, OfflineClient, ReachabilityProbe, RemoteError, RemoteStore, RestRemote,
};

#[derive(Parser)]
#[command(name = "offsync")]
#[command(version)]
#[command(about = "Offline-first client for a remote record store", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Skip the remote entirely and use the offline paths
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read records (served from the local cache when offline)
    Select(SelectCommand),

    /// Insert a record (queued when offline)
    Insert(InsertCommand),

    /// Update records by key (queued when offline)
    Update(UpdateCommand),

    /// Delete a record by key (queued when offline)
    Delete(DeleteCommand),

    /// Replay queued writes and inspect the queue
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let remote: Arc<dyn RemoteStore> = match RestRemote::from_config(&config.remote) {
        Ok(remote) => Arc::new(remote),
        Err(RemoteError::NotConfigured) => {
            tracing::warn!("Remote not configured; working offline");
            Arc::new(Disconnected)
        }
        Err(e) => return Err(e.into()),
    };

    let probe_interval = Duration::from_secs(config.probe_interval_secs.value);
    let client = OfflineClient::open(&config.database_path.value, remote.clone(), false).await?;
    let monitor = client.monitor();

    // One reachability check stands in for the platform's connectivity
    // signal; coming up online replays whatever is still queued.
    if !cli.offline {
        let mut probe = ReachabilityProbe::new(remote.clone(), probe_interval);
        if let Some(event) = probe.check().await {
            monitor.handle(event).await;
        }
    }

    match command {
        Commands::Select(cmd) => cmd.run(client.gateway()).await?,
        Commands::Insert(cmd) => cmd.run(client.gateway()).await?,
        Commands::Update(cmd) => cmd.run(client.gateway()).await?,
        Commands::Delete(cmd) => cmd.run(client.gateway()).await?,
        Commands::Sync(cmd) => cmd.run(&client, remote, probe_interval).await?,
        Commands::Config(cmd) => cmd.run(&config)?,
    }

    Ok(())
}
