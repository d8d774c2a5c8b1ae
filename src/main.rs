//! Maintenance CLI for Nightfall session snapshots.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nightfall_engine::{
    config::EngineConfig,
    services::snapshot_service::SnapshotService,
};

#[derive(Parser)]
#[command(name = "nightfall", about = "Inspect and maintain Nightfall session snapshots")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions stored in the fallback directory
    List,
    /// Print the latest snapshot of a session as JSON
    Show {
        /// Session identifier
        session_id: String,
    },
    /// Delete the fallback snapshot file of a session
    Delete {
        /// Session identifier
        session_id: String,
    },
    /// Try to reach the configured durable backend
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = EngineConfig::load();
    let service = SnapshotService::from_config(&config);

    match cli.command {
        Commands::List => {
            let sessions = service
                .list_snapshots()
                .await
                .context("listing fallback snapshots")?;
            info!(
                count = sessions.len(),
                dir = %service.data_dir().display(),
                "fallback snapshots"
            );
            for session_id in sessions {
                println!("{session_id}");
            }
        }
        Commands::Show { session_id } => {
            let loaded = service
                .load_snapshot(&session_id)
                .await
                .with_context(|| format!("loading session `{session_id}`"))?;
            match loaded {
                Some(loaded) => {
                    let rendered = serde_json::to_string_pretty(&loaded)
                        .context("rendering snapshot")?;
                    println!("{rendered}");
                }
                None => anyhow::bail!("no snapshot stored for session `{session_id}`"),
            }
        }
        Commands::Delete { session_id } => {
            let removed = service
                .delete_snapshot(&session_id)
                .await
                .with_context(|| format!("deleting session `{session_id}`"))?;
            println!("{}", if removed { "deleted" } else { "not found" });
        }
        Commands::Probe => {
            let state = service.resolve_backend().await;
            println!("backend {}: {state:?}", config.backend.as_str());
        }
    }

    Ok(())
}

/// Configure tracing; `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
