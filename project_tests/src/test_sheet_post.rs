//! # Sheet Post Live Test
//!
//! Posts one synthetic influence record to the configured sink and prints
//! the delivery outcome. This runs against the real endpoint, so it lives
//! here as a runnable binary rather than in `cargo test`.

use clap::Parser;
use lib_relay::core::record::RecordBuilder;
use lib_relay::journal::event::JournalEvent;
use lib_relay::retrieve::sheet::SheetClient;
use lib_relay::Settings;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(about = "Post one synthetic record to the configured sheet sink")]
struct Args {
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

    // // Statement: Build a recognizable synthetic record so the test row
    // // is easy to spot (and delete) in the sheet.
    let event = JournalEvent::from_value(serde_json::json!({
        "timestamp": "2024-01-01T00:00:00Z",
        "StarSystem": "RELAY SMOKE TEST",
        "StarPos": [0.0, 0.0, 0.0],
        "Factions": [
            {"Name": "Smoke Test Faction", "Influence": 1.0, "FactionState": "None"}
        ]
    }))?;
    let record = RecordBuilder::from_settings(&settings.events).build(&event, &event.factions, 0.0);

    println!("[*] Posting synthetic record to {} ...", settings.sheet.url);
    let client = SheetClient::new(&settings.sheet, CancellationToken::new())?;
    let outcome = client.send(&record).await;
    println!("[RESULT] {outcome:?}");
    Ok(())
}
