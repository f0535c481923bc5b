//! Offline replay: feeds a line-delimited journal file through the same
//! pipeline the live daemon runs, for backfills and dry runs.

use std::path::PathBuf;

use clap::Parser;
use lib_relay::core::pipeline::Pipeline;
use lib_relay::ingestors::replay::replay_file;
use lib_relay::{loggers, Settings};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Replay a journal file through the influence relay pipeline")]
struct Args {
    /// Line-delimited journal JSON file to replay.
    journal: PathBuf,

    /// Explicit configuration file (defaults to the standard search order).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let _log_guard = loggers::init("replay", &settings.logging)?;

    let shutdown = CancellationToken::new();
    let mut pipeline = Pipeline::from_settings(&settings, shutdown)?;

    info!(file = %args.journal.display(), "replaying journal file");
    let stats = replay_file(&args.journal, &mut pipeline).await?;
    println!(
        "replayed {} lines: {} consumed, {} skipped, {} undecodable",
        stats.lines, stats.consumed, stats.skipped, stats.undecodable
    );
    Ok(())
}
