//! # Journal Event Model
//!
//! Typed model of the upstream journal telemetry, plus the schema and
//! event-type gates the ingestors apply before anything reaches the pipeline.

pub mod event;

/// The `$schemaRef` value tagging a feed envelope as journal telemetry.
pub const JOURNAL_SCHEMA_REF: &str = "http://schemas.elite-markets.net/eddn/journal/1";

/// Journal event types that carry the system faction payload we relay.
/// `Location` is the on-login event whose faction fields are the same
/// subset `FSDJump` carries.
pub const RELAYED_EVENTS: [&str; 2] = ["FSDJump", "Location"];

/// Returns true if the named journal event type should be relayed.
pub fn is_relayed_event(name: &str) -> bool {
    RELAYED_EVENTS.contains(&name)
}
