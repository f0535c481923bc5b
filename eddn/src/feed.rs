//! Live relay daemon: subscribes to the public journal feed and forwards
//! faction influence changes around the configured volumes to the sheet.

use lib_relay::core::pipeline::Pipeline;
use lib_relay::ingestors::feed::EddnFeed;
use lib_relay::{loggers, Settings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first, so RELAY_CONFIG / SHEET_API_KEY from .env apply.
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    let _log_guard = loggers::init("feed", &settings.logging)?;

    for location in &settings.locations {
        info!(name = %location.name, radius = location.distance, "configured interest volume");
    }

    let shutdown = CancellationToken::new();
    let mut pipeline = Pipeline::from_settings(&settings, shutdown.clone())?;
    let feed = EddnFeed::new(&settings.eddn);

    // Ctrl-C cancels the token; the feed loop and any in-flight retry wait
    // both observe it.
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    if let Err(err) = feed.run(&mut pipeline, shutdown).await {
        error!(error = %err, "feed loop terminated abnormally");
        return Err(err);
    }
    Ok(())
}
