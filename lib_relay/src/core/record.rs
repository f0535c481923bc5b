//! # Record Builder
//!
//! Reshapes a journal event plus its sorted faction list into the flat
//! field/value record the spreadsheet sink ingests. The sink expects a
//! uniform column shape: descriptor columns are always present (empty when
//! the feed omitted them) and every faction slot always carries its
//! Pending/Recovering state columns, even when empty.

use std::collections::HashSet;

use regex::Regex;

use crate::configs::settings::{parse_name_list, EventSettings};
use crate::journal::event::{Faction, JournalEvent, TrendingState};

/// A flat, insertion-ordered field/value record ready for form encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecord {
    fields: Vec<(String, String)>,
}

impl OutputRecord {
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// The record's fields in insertion order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Point lookup by field name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Builds `OutputRecord`s according to the configured ignore-list and
/// rounding policy. No I/O; output is fully determined by inputs and
/// configuration.
#[derive(Debug)]
pub struct RecordBuilder {
    ignore_factions: HashSet<String>,
    distance_dp: i32,
    location_dp: i32,
    /// Normalization table for the feed's raw localization-key descriptor
    /// format (`$prefix_Value;` reduces to `Value`; anything else passes
    /// through raw).
    government: Regex,
    security: [Regex; 2],
    economy: Regex,
}

impl RecordBuilder {
    pub fn new(ignore_factions: HashSet<String>, distance_dp: i32, location_dp: i32) -> Self {
        Self {
            ignore_factions,
            distance_dp,
            location_dp,
            government: Regex::new(r"(?i)^\$government_(.*);").expect("static pattern"),
            security: [
                Regex::new(r"(?i)^\$system_security_(.*);").expect("static pattern"),
                Regex::new(r"(?i)^\$GALAXY_MAP_INFO_state_(.*);").expect("static pattern"),
            ],
            economy: Regex::new(r"(?i)^\$economy_(.*);").expect("static pattern"),
        }
    }

    pub fn from_settings(events: &EventSettings) -> Self {
        Self::new(
            parse_name_list(&events.ignore_factions),
            events.distance_dp,
            events.location_dp,
        )
    }

    /// True if at least one faction survives the ignore-list, i.e. the
    /// event has something worth reporting.
    pub fn has_reportable(&self, factions: &[Faction]) -> bool {
        factions
            .iter()
            .any(|faction| !self.ignore_factions.contains(&faction.name))
    }

    /// Builds the flat record for one event.
    ///
    /// `factions` must already be sorted descending by influence (stable);
    /// `distance` is the light-year distance to the nearest configured
    /// volume center.
    pub fn build(&self, event: &JournalEvent, factions: &[Faction], distance: f64) -> OutputRecord {
        let mut record = OutputRecord::default();
        record.push("Timestamp", event.timestamp.clone());
        record.push("StarSystem", event.star_system.clone());
        record.push("SystemFaction", event.system_faction.clone());
        record.push("SystemAllegiance", event.system_allegiance.clone());
        record.push(
            "SystemSecurity",
            strip_templated(&self.security, &event.system_security),
        );
        record.push(
            "SystemGovernment",
            strip_templated(std::slice::from_ref(&self.government), &event.system_government),
        );
        record.push(
            "SystemEconomy",
            strip_templated(std::slice::from_ref(&self.economy), &event.system_economy),
        );

        // Slot numbers are dense over retained factions: an ignored faction
        // consumes no slot and does not shift the ones after it.
        let mut slot = 1;
        for faction in factions {
            if self.ignore_factions.contains(&faction.name) {
                continue;
            }
            let prefix = format!("Faction{slot}");
            record.push(format!("{prefix}Name"), faction.name.clone());
            record.push(format!("{prefix}Influence"), faction.influence.to_string());
            record.push(format!("{prefix}State"), faction.state.clone());
            record.push(format!("{prefix}Allegiance"), faction.allegiance.clone());
            record.push(format!("{prefix}Government"), faction.government.clone());
            record.push(format!("{prefix}PendingState"), join_states(&faction.pending_states));
            record.push(
                format!("{prefix}RecoveringState"),
                join_states(&faction.recovering_states),
            );
            slot += 1;
        }

        record.push("EventDate", event.event_date());
        record.push("EventTime", event.event_time());
        record.push(
            "Distance",
            round_dp(distance, self.distance_dp).to_string(),
        );
        record.push(
            "LocationX",
            round_dp(event.star_pos[0], self.location_dp).to_string(),
        );
        record.push(
            "LocationY",
            round_dp(event.star_pos[1], self.location_dp).to_string(),
        );
        record.push(
            "LocationZ",
            round_dp(event.star_pos[2], self.location_dp).to_string(),
        );
        record.push(
            "Population",
            event.population.map(|p| p.to_string()).unwrap_or_default(),
        );
        record
    }
}

/// Reduces a templated descriptor to its real value, passing unmatched
/// input through raw.
fn strip_templated(patterns: &[Regex], raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    for pattern in patterns {
        if let Some(captures) = pattern.captures(raw) {
            return captures[1].to_owned();
        }
    }
    raw.to_owned()
}

/// Comma-joins state names; empty string when there are none.
fn join_states(states: &[TrendingState]) -> String {
    states
        .iter()
        .map(|s| s.state.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Rounds to `dp` decimal places; negative `dp` disables rounding.
fn round_dp(value: f64, dp: i32) -> f64 {
    if dp < 0 {
        return value;
    }
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> JournalEvent {
        JournalEvent::from_value(json!({
            "timestamp": "2024-03-09T18:25:11Z",
            "StarSystem": "Disci",
            "StarPos": [16.03125, 97.59375, -29.59375],
            "SystemFaction": "Disci Interstellar",
            "SystemAllegiance": "Federation",
            "SystemSecurity": "$SYSTEM_SECURITY_medium;",
            "SystemGovernment": "$government_Corporate;",
            "SystemEconomy": "$economy_Industrial;",
            "Population": 85206,
            "Factions": [
                {
                    "Name": "A",
                    "Influence": 0.7,
                    "FactionState": "Boom",
                    "Allegiance": "Federation",
                    "Government": "Corporate",
                    "PendingStates": [
                        {"State": "Expansion", "Trend": 1},
                        {"State": "CivilUnrest", "Trend": 0}
                    ]
                },
                {
                    "Name": "B",
                    "Influence": 0.3,
                    "FactionState": "None",
                    "Allegiance": "Independent",
                    "Government": "Democracy"
                }
            ]
        }))
        .unwrap()
    }

    fn builder() -> RecordBuilder {
        RecordBuilder::new(HashSet::new(), -1, -1)
    }

    #[test]
    fn full_record_shape_for_two_factions_at_the_center() {
        let event = sample_event();
        let record = builder().build(&event, &event.factions, 0.0);

        assert_eq!(record.get("Timestamp"), Some("2024-03-09T18:25:11Z"));
        assert_eq!(record.get("StarSystem"), Some("Disci"));
        assert_eq!(record.get("SystemFaction"), Some("Disci Interstellar"));
        assert_eq!(record.get("EventDate"), Some("2024-03-09"));
        assert_eq!(record.get("EventTime"), Some("18:25:11"));
        assert_eq!(record.get("Distance"), Some("0"));
        assert_eq!(record.get("Population"), Some("85206"));
        assert_eq!(record.get("Faction1Name"), Some("A"));
        assert_eq!(record.get("Faction1Influence"), Some("0.7"));
        assert_eq!(record.get("Faction1State"), Some("Boom"));
        assert_eq!(record.get("Faction1PendingState"), Some("Expansion,CivilUnrest"));
        assert_eq!(record.get("Faction1RecoveringState"), Some(""));
        assert_eq!(record.get("Faction2Name"), Some("B"));
        assert_eq!(record.get("Faction2Influence"), Some("0.3"));
        assert_eq!(record.get("Faction3Name"), None);
    }

    #[test]
    fn ignored_faction_consumes_no_slot() {
        let event = sample_event();
        let builder = RecordBuilder::new(parse_name_list("A"), -1, -1);
        let record = builder.build(&event, &event.factions, 0.0);

        // B, originally second-ranked, lands in slot 1.
        assert_eq!(record.get("Faction1Name"), Some("B"));
        assert_eq!(record.get("Faction1Influence"), Some("0.3"));
        assert_eq!(record.get("Faction2Name"), None);
    }

    #[test]
    fn has_reportable_respects_the_ignore_list() {
        let event = sample_event();
        let all_ignored = RecordBuilder::new(parse_name_list("A, B"), -1, -1);
        assert!(!all_ignored.has_reportable(&event.factions));
        let some_ignored = RecordBuilder::new(parse_name_list("A"), -1, -1);
        assert!(some_ignored.has_reportable(&event.factions));
    }

    #[test]
    fn templated_descriptors_are_reduced_to_their_value() {
        let event = sample_event();
        let record = builder().build(&event, &event.factions, 0.0);
        assert_eq!(record.get("SystemSecurity"), Some("medium"));
        assert_eq!(record.get("SystemGovernment"), Some("Corporate"));
        assert_eq!(record.get("SystemEconomy"), Some("Industrial"));
        // Allegiance is free text, passed through untouched.
        assert_eq!(record.get("SystemAllegiance"), Some("Federation"));
    }

    #[test]
    fn galaxy_map_security_spelling_is_also_reduced() {
        let mut event = sample_event();
        event.system_security = "$GAlAXY_MAP_INFO_state_anarchy;".to_owned();
        let record = builder().build(&event, &event.factions, 0.0);
        assert_eq!(record.get("SystemSecurity"), Some("anarchy"));
    }

    #[test]
    fn unmatched_descriptor_passes_through_raw() {
        let mut event = sample_event();
        event.system_security = "Medium".to_owned();
        let record = builder().build(&event, &event.factions, 0.0);
        assert_eq!(record.get("SystemSecurity"), Some("Medium"));
    }

    #[test]
    fn absent_descriptors_yield_empty_columns() {
        let event = JournalEvent::from_value(json!({
            "timestamp": "2024-03-09T18:25:11Z",
            "StarSystem": "Disci",
            "StarPos": [0.0, 0.0, 0.0],
            "Factions": [{"Name": "A", "Influence": 0.5}]
        }))
        .unwrap();
        let record = builder().build(&event, &event.factions, 0.0);
        assert_eq!(record.get("SystemAllegiance"), Some(""));
        assert_eq!(record.get("SystemSecurity"), Some(""));
        assert_eq!(record.get("Population"), Some(""));
    }

    #[test]
    fn rounding_policy_applies_to_distance_and_position() {
        let event = sample_event();
        let rounded = RecordBuilder::new(HashSet::new(), 1, 2);
        let record = rounded.build(&event, &event.factions, 12.3456);
        assert_eq!(record.get("Distance"), Some("12.3"));
        assert_eq!(record.get("LocationX"), Some("16.03"));
        assert_eq!(record.get("LocationY"), Some("97.59"));
        assert_eq!(record.get("LocationZ"), Some("-29.59"));

        // Negative precision leaves values untouched.
        let raw = builder().build(&event, &event.factions, 12.3456);
        assert_eq!(raw.get("Distance"), Some("12.3456"));
        assert_eq!(raw.get("LocationX"), Some("16.03125"));
    }
}
