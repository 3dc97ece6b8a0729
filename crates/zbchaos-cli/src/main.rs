//! zbchaos — resize a running cluster through its management actuator.
//!
//! # Usage
//!
//! ```text
//! zbchaos cluster status
//! zbchaos cluster scale --brokers 5
//! zbchaos cluster scale --partition-count 6 --replication-factor 3
//! zbchaos cluster wait --change-id 12
//! zbchaos cluster force-failover --regions 2 --region-id 0 --brokers 4
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zbchaos_core::ChaosConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "zbchaos",
    about = "Scale and fail over a partitioned, replicated cluster",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to a zbchaos.toml file. Built-in defaults apply without one.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Management actuator base URL (overrides [cluster].endpoint).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change the cluster topology
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
}

#[derive(Subcommand)]
enum ClusterAction {
    /// Print the current topology as JSON
    Status,
    /// Wait for a change to finish.
    ///
    /// Without --change-id the pending change is tracked, falling back to
    /// the last one.
    Wait {
        #[arg(long)]
        change_id: Option<i64>,
    },
    /// Resize brokers, partitions or the replication factor.
    ///
    /// Only one kind of change is requested per call; a broker change takes
    /// precedence over partition changes.
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .multiple(true)
            .args(["brokers", "partition_count", "replication_factor"])
    ))]
    Scale {
        /// Desired number of brokers.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        brokers: Option<u32>,
        /// Desired number of partitions (can only grow).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        partition_count: Option<u32>,
        /// Desired replication factor.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        replication_factor: Option<u32>,
    },
    /// Force-remove every broker outside one region.
    ForceFailover {
        /// Number of regions brokers are spread over.
        #[arg(long, default_value = "2")]
        regions: u32,
        /// Region that survives.
        #[arg(long, default_value = "0")]
        region_id: u32,
        /// Broker count to wait for before failing over.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        brokers: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "warn,zbchaos=debug"
    } else {
        "warn,zbchaos=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    let config = load_config(cli.config.as_deref(), cli.endpoint)?;

    // Ctrl-C aborts any wait in progress; the remote change keeps running.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, abandoning wait");
            let _ = shutdown_tx.send(true);
        }
    });

    match cli.command {
        Commands::Cluster { action } => match action {
            ClusterAction::Status => commands::cluster::status(&config).await,
            ClusterAction::Wait { change_id } => {
                commands::cluster::wait(&config, change_id, shutdown_rx).await
            }
            ClusterAction::Scale {
                brokers,
                partition_count,
                replication_factor,
            } => {
                let target = zbchaos_scale::ScaleTarget {
                    brokers,
                    partitions: partition_count,
                    replication_factor,
                };
                commands::cluster::scale(&config, target, shutdown_rx).await
            }
            ClusterAction::ForceFailover {
                regions,
                region_id,
                brokers,
            } => {
                commands::cluster::force_failover(&config, regions, region_id, brokers, shutdown_rx)
                    .await
            }
        },
    }
}

fn load_config(path: Option<&std::path::Path>, endpoint: Option<String>) -> anyhow::Result<ChaosConfig> {
    let mut config = match path {
        Some(path) => ChaosConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ChaosConfig::default(),
    };
    if let Some(endpoint) = endpoint {
        config.cluster.endpoint = endpoint;
    }
    config.validate()?;
    Ok(config)
}
