//! Typed journal event records.
//!
//! The feed delivers loosely structured JSON; this module is the single
//! validation boundary. Everything past `JournalEvent::from_value` is a
//! well-formed record with a named field for every value the pipeline reads,
//! and a malformed message surfaces as an `EventError` for that one event
//! instead of a lookup failure deep in the pipeline.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors produced while decoding a single journal event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The JSON payload is missing a required field or has a wrong type.
    #[error("event is not a valid journal record: {0}")]
    Decode(#[from] serde_json::Error),

    /// The timestamp is too short to carry `YYYY-MM-DDThh:mm:ss`.
    #[error("event timestamp is malformed: {0:?}")]
    Timestamp(String),
}

/// A pending or recovering faction state with its trend value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrendingState {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Trend", default)]
    pub trend: i64,
}

/// One faction's standing within a system, as reported by the feed.
///
/// Derived `PartialEq` over the full field set is what the observation cache
/// uses for change detection: any influence, state or ordering change in the
/// faction list counts as a new observation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Faction {
    #[serde(rename = "Name")]
    pub name: String,
    /// Fractional influence in [0, 1].
    #[serde(rename = "Influence")]
    pub influence: f64,
    #[serde(rename = "FactionState", default)]
    pub state: String,
    #[serde(rename = "Allegiance", default)]
    pub allegiance: String,
    #[serde(rename = "Government", default)]
    pub government: String,
    /// The feed sends an explicit `null` here when no states are pending.
    #[serde(rename = "PendingStates", default, deserialize_with = "null_to_default")]
    pub pending_states: Vec<TrendingState>,
    #[serde(rename = "RecoveringStates", default, deserialize_with = "null_to_default")]
    pub recovering_states: Vec<TrendingState>,
}

/// One relayed journal event (`FSDJump`, or the equivalent `Location` subset).
///
/// Only `timestamp`, `StarSystem` and `StarPos` are guaranteed by the feed;
/// everything else defaults to empty/absent.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalEvent {
    /// ISO-like UTC timestamp, e.g. `2017-10-05T10:17:38Z`.
    #[serde(rename = "timestamp")]
    pub timestamp: String,
    #[serde(rename = "StarSystem")]
    pub star_system: String,
    /// Galactic position in light years: (x, y, z).
    #[serde(rename = "StarPos")]
    pub star_pos: [f64; 3],
    #[serde(rename = "SystemFaction", default)]
    pub system_faction: String,
    #[serde(rename = "SystemAllegiance", default)]
    pub system_allegiance: String,
    #[serde(rename = "SystemSecurity", default)]
    pub system_security: String,
    #[serde(rename = "SystemGovernment", default)]
    pub system_government: String,
    #[serde(rename = "SystemEconomy", default)]
    pub system_economy: String,
    #[serde(rename = "Population", default)]
    pub population: Option<u64>,
    #[serde(rename = "Factions", default, deserialize_with = "null_to_default")]
    pub factions: Vec<Faction>,
}

impl JournalEvent {
    /// Decodes and validates a journal event from its JSON form.
    ///
    /// This is the only supported way to build an event from feed input;
    /// it guarantees the timestamp accessors below cannot slice out of
    /// bounds.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EventError> {
        let event: JournalEvent = serde_json::from_value(value)?;
        // `YYYY-MM-DDThh:mm:ss` is 19 ASCII characters; both slices must exist.
        if event.timestamp.get(0..10).is_none() || event.timestamp.get(11..19).is_none() {
            return Err(EventError::Timestamp(event.timestamp));
        }
        Ok(event)
    }

    /// The UTC date component (`YYYY-MM-DD`) of the event timestamp.
    pub fn event_date(&self) -> &str {
        self.timestamp.get(0..10).unwrap_or("")
    }

    /// The UTC time component (`hh:mm:ss`) of the event timestamp.
    pub fn event_time(&self) -> &str {
        self.timestamp.get(11..19).unwrap_or("")
    }
}

/// Treats an explicit JSON `null` the same as an absent field.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
