//! Sync CLI commands for replaying queued writes and inspecting the queue.

use clap::{Args, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use offsync::{
    OfflineClient, ReachabilityProbe, RemoteStore, SkipReason, SyncOutcome, SyncStatus,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show connectivity and pending operation count
    Status,

    /// List pending operations in replay order
    Pending {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Keep watching connectivity and sync whenever the remote comes back
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        client: &OfflineClient,
        remote: Arc<dyn RemoteStore>,
        probe_interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(client).await,
            Some(SyncSubcommand::Status) => self.status(client).await,
            Some(SyncSubcommand::Pending { format }) => self.pending(client, format).await,
            Some(SyncSubcommand::Watch) => self.watch(client, remote, probe_interval).await,
        }
    }

    async fn sync(&self, client: &OfflineClient) -> Result<(), Box<dyn std::error::Error>> {
        match client.engine().sync().await {
            SyncOutcome::Skipped(SkipReason::Offline) => {
                println!("Offline: nothing synced. Changes will sync when back online.");
            }
            SyncOutcome::Skipped(SkipReason::AlreadySyncing) => {
                println!("A sync is already in progress.");
            }
            SyncOutcome::Completed(report) if report.attempted == 0 => {
                println!("Already up to date.");
            }
            SyncOutcome::Completed(report) => {
                println!("  ✓ {} replayed", report.replayed);
                if report.failed > 0 {
                    println!("  ✗ {} failed (kept for next sync)", report.failed);
                }
            }
        }

        let pending = client.queue().count().await?;
        if pending == 0 {
            println!("All data synced.");
        } else {
            println!("{} operation(s) pending.", pending);
        }
        Ok(())
    }

    async fn status(&self, client: &OfflineClient) -> Result<(), Box<dyn std::error::Error>> {
        let status = SyncStatus {
            online: client.connectivity().is_online(),
            pending: client.queue().count().await?,
        };

        println!("Sync Status");
        println!("===========");
        println!();
        println!("Remote:  {}", if status.online { "✓ online" } else { "✗ offline" });
        println!("Pending: {}", status.pending);
        println!();
        println!("{}", status);
        Ok(())
    }

    async fn pending(
        &self,
        client: &OfflineClient,
        format: &OutputFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let ops = client.queue().list().await?;

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ops)?),
            OutputFormat::Text => {
                if ops.is_empty() {
                    println!("No pending operations.");
                }
                for op in &ops {
                    println!("{}  [{}]", op, op.id);
                }
            }
        }
        Ok(())
    }

    async fn watch(
        &self,
        client: &OfflineClient,
        remote: Arc<dyn RemoteStore>,
        probe_interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let monitor = client.monitor();
        let mut status = monitor.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let probe = ReachabilityProbe::new(remote, probe_interval);
        let probe_task = tokio::spawn(probe.run(tx));
        let monitor_task = tokio::spawn(monitor.run(rx));

        println!("Watching connectivity (Ctrl-C to stop)...");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("{}", *status.borrow_and_update());
                }
            }
        }

        probe_task.abort();
        monitor_task.abort();
        Ok(())
    }
}
