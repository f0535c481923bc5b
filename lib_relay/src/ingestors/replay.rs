//! # Journal File Replay
//!
//! Offline counterpart to the live feed: reads line-delimited journal JSON
//! (one object per line) and feeds the relayed event types through the same
//! pipeline. Used for backfilling and for exercising the pipeline without a
//! feed connection.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::warn;

use crate::core::pipeline::Pipeline;
use crate::journal::event::JournalEvent;
use crate::journal::is_relayed_event;

/// Counters for one replay run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-empty lines read.
    pub lines: usize,
    /// Lines that were not valid journal JSON.
    pub undecodable: usize,
    /// Well-formed events of types we do not relay.
    pub skipped: usize,
    /// Events handed to the pipeline.
    pub consumed: usize,
}

/// Replays a journal file through the pipeline, isolating per-line failures.
pub async fn replay_file(path: &Path, pipeline: &mut Pipeline) -> anyhow::Result<ReplayStats> {
    let file = File::open(path)
        .with_context(|| format!("failed to open journal file {}", path.display()))?;
    let mut stats = ReplayStats::default();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed reading line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(error) => {
                warn!(line = number + 1, %error, "skipping undecodable journal line");
                stats.undecodable += 1;
                continue;
            }
        };
        let event_name = value
            .get("event")
            .and_then(|name| name.as_str())
            .unwrap_or_default();
        if !is_relayed_event(event_name) {
            stats.skipped += 1;
            continue;
        }
        match JournalEvent::from_value(value) {
            Ok(event) => {
                pipeline.consume(&event).await;
                stats.consumed += 1;
            }
            Err(error) => {
                warn!(line = number + 1, %error, "skipping malformed journal event");
                stats.undecodable += 1;
            }
        }
    }
    Ok(stats)
}
