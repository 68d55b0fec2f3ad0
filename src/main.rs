//! This is a workload generator binary which synthesizes realistic client
//! load against an HTTP server.
//!
//! One line per completed session is written to stdout:
//!
//! ```text
//! sessionId path statusClassifier reasonText byteCount elapsedSeconds
//! ```
//!
//! Logging and the end-of-run summary go to stderr, so stdout stays a clean
//! record stream for log processing.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use webload::config::Config;
use webload::generator::WorkloadGenerator;

/// Workload generator for a web server.
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: PathBuf,

    /// override the configured random seed
    #[argh(option, short = 'n')]
    pub seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let args: Args = argh::from_env();
    let config_file = std::fs::File::open(&args.config).context("failed to open config file")?;
    let mut config: Config =
        serde_yaml::from_reader(config_file).context("failed to parse config YAML")?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        load = config.load,
        seed = config.seed,
        "starting workload"
    );

    let generator = WorkloadGenerator::new(config)?;
    let report = generator.run(std::io::stdout().lock()).await?;

    report.summary.print(report.elapsed);
    tracing::info!(
        spawned = report.spawned,
        recorded = report.recorded,
        "workload finished"
    );

    Ok(())
}

fn initialize_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
