use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod config;
mod scenarios;

use config::DemoConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Args {
    /// TOML file overriding the scenario defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    scenario: Option<Scenario>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Unguarded versus guarded counter under concurrent increments
    Counter,
    /// Concurrent deposits and withdrawals on a shared ledger
    Ledger,
    /// Parallel readers and an exclusive writer on a shared dataset
    Dataset,
    /// Unbuffered, buffered, directional and closed channels
    Channels,
    /// Waiting on the first of several channels with a timeout
    Select,
    /// A fixed pool of workers draining a job queue
    Pool,
    /// Abandoning a slow task once its deadline passes
    Timeout,
    /// Every scenario in order
    All,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = DemoConfig::load(args.config.as_deref())?;
    tracing::debug!("Loaded scenario config: {:?}", config);

    scenarios::run(args.scenario.unwrap_or(Scenario::All), &config)
}
