//! # Relevance Filter
//!
//! Decides whether an incoming journal event is worth processing at all:
//! a spatial test against the configured interest volumes (always-include
//! systems bypass it) followed by an optional today-only freshness test.
//! Distances are kept squared throughout; the square root is taken once,
//! by the pipeline, for the reported distance.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::configs::settings::{parse_name_list, EventSettings, LocationSettings};
use crate::journal::event::JournalEvent;

/// A spherical interest volume: named center plus radius.
#[derive(Debug, Clone)]
pub struct InterestVolume {
    pub name: String,
    center: [f64; 3],
    radius: f64,
    /// Cached at construction so the hot path never exponentiates.
    radius_sq: f64,
}

impl InterestVolume {
    pub fn new(name: impl Into<String>, center: [f64; 3], radius: f64) -> Self {
        Self {
            name: name.into(),
            center,
            radius,
            radius_sq: radius * radius,
        }
    }

    /// Squared Euclidean distance from this volume's center to `pos`.
    pub fn distance_sq(&self, pos: [f64; 3]) -> f64 {
        let dx = self.center[0] - pos[0];
        let dy = self.center[1] - pos[1];
        let dz = self.center[2] - pos[2];
        dx * dx + dy * dy + dz * dz
    }

    /// True if `pos` lies within this volume.
    pub fn contains(&self, pos: [f64; 3]) -> bool {
        self.distance_sq(pos) <= self.radius_sq
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl From<&LocationSettings> for InterestVolume {
    fn from(location: &LocationSettings) -> Self {
        Self::new(
            location.name.clone(),
            [location.x, location.y, location.z],
            location.distance,
        )
    }
}

/// Spatial + temporal relevance test for incoming events.
///
/// Pure: the only inputs are the configuration captured at construction and
/// the event itself (plus the current UTC date for the freshness test).
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    volumes: Vec<InterestVolume>,
    include_systems: HashSet<String>,
    today_only: bool,
}

impl RelevanceFilter {
    pub fn new(
        volumes: Vec<InterestVolume>,
        include_systems: HashSet<String>,
        today_only: bool,
    ) -> Self {
        Self {
            volumes,
            include_systems,
            today_only,
        }
    }

    /// Builds the filter straight from configuration sections.
    pub fn from_settings(events: &EventSettings, locations: &[LocationSettings]) -> Self {
        Self::new(
            locations.iter().map(InterestVolume::from).collect(),
            parse_name_list(&events.include_systems),
            events.today_only,
        )
    }

    /// Returns true if the event should be processed further.
    pub fn is_interesting(&self, event: &JournalEvent) -> bool {
        self.is_interesting_on(event, &Utc::now().format("%Y-%m-%d").to_string())
    }

    /// Date-parameterized core of `is_interesting`; `today` is the current
    /// UTC date as `YYYY-MM-DD`.
    pub fn is_interesting_on(&self, event: &JournalEvent, today: &str) -> bool {
        if !self.is_interesting_system(event) {
            return false;
        }
        // NOTE: assumption we receive UTC timestamps.
        if self.today_only && event.event_date() != today {
            debug!(
                system = %event.star_system,
                date = %event.event_date(),
                "event discarded as not today"
            );
            return false;
        }
        true
    }

    /// Spatial half of the test: always-include set, then any volume.
    pub fn is_interesting_system(&self, event: &JournalEvent) -> bool {
        if self.include_systems.contains(&event.star_system) {
            return true;
        }
        self.volumes
            .iter()
            .any(|volume| volume.contains(event.star_pos))
    }

    /// Minimum squared distance from the event position to any configured
    /// volume center, or `None` when no volumes are configured.
    pub fn nearest_distance_sq(&self, pos: [f64; 3]) -> Option<f64> {
        self.volumes
            .iter()
            .map(|volume| volume.distance_sq(pos))
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn volumes(&self) -> &[InterestVolume] {
        &self.volumes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_at(system: &str, pos: [f64; 3], date: &str) -> JournalEvent {
        JournalEvent::from_value(json!({
            "timestamp": format!("{date}T10:17:38Z"),
            "StarSystem": system,
            "StarPos": pos,
        }))
        .unwrap()
    }

    fn volume_at(pos: [f64; 3], radius: f64) -> InterestVolume {
        InterestVolume::new("test", pos, radius)
    }

    #[test]
    fn event_outside_every_volume_is_not_interesting() {
        let filter = RelevanceFilter::new(
            vec![volume_at([0.0, 0.0, 0.0], 10.0), volume_at([100.0, 0.0, 0.0], 5.0)],
            HashSet::new(),
            false,
        );
        let event = event_at("Far Away", [0.0, 50.0, 0.0], "2024-01-01");
        assert!(!filter.is_interesting_on(&event, "2024-01-01"));
    }

    #[test]
    fn event_within_any_one_volume_is_interesting() {
        let filter = RelevanceFilter::new(
            vec![volume_at([0.0, 0.0, 0.0], 10.0), volume_at([100.0, 0.0, 0.0], 5.0)],
            HashSet::new(),
            false,
        );
        let event = event_at("Nearby", [102.0, 0.0, 0.0], "2024-01-01");
        assert!(filter.is_interesting_on(&event, "2024-01-01"));
    }

    #[test]
    fn boundary_distance_is_inside() {
        let filter = RelevanceFilter::new(
            vec![volume_at([0.0, 0.0, 0.0], 10.0)],
            HashSet::new(),
            false,
        );
        let event = event_at("Edge", [10.0, 0.0, 0.0], "2024-01-01");
        assert!(filter.is_interesting_on(&event, "2024-01-01"));
    }

    #[test]
    fn included_system_bypasses_the_spatial_test() {
        let filter = RelevanceFilter::new(
            vec![],
            parse_name_list("Sol, Disci"),
            false,
        );
        let event = event_at("Disci", [10_000.0, 0.0, 0.0], "2024-01-01");
        assert!(filter.is_interesting_on(&event, "2024-01-01"));
    }

    #[test]
    fn no_volumes_and_no_includes_means_nothing_is_relevant() {
        let filter = RelevanceFilter::new(vec![], HashSet::new(), false);
        let event = event_at("Sol", [0.0, 0.0, 0.0], "2024-01-01");
        assert!(!filter.is_interesting_on(&event, "2024-01-01"));
    }

    #[test]
    fn today_only_discards_stale_events() {
        let filter = RelevanceFilter::new(
            vec![volume_at([0.0, 0.0, 0.0], 10.0)],
            HashSet::new(),
            true,
        );
        let stale = event_at("Sol", [0.0, 0.0, 0.0], "2024-01-01");
        assert!(!filter.is_interesting_on(&stale, "2024-01-02"));
        let fresh = event_at("Sol", [0.0, 0.0, 0.0], "2024-01-02");
        assert!(filter.is_interesting_on(&fresh, "2024-01-02"));
    }

    #[test]
    fn nearest_distance_picks_the_closest_center() {
        let filter = RelevanceFilter::new(
            vec![volume_at([0.0, 0.0, 0.0], 10.0), volume_at([3.0, 4.0, 0.0], 10.0)],
            HashSet::new(),
            false,
        );
        let d2 = filter.nearest_distance_sq([3.0, 0.0, 0.0]).unwrap();
        assert_eq!(d2, 9.0);

        let empty = RelevanceFilter::new(vec![], HashSet::new(), false);
        assert!(empty.nearest_distance_sq([3.0, 0.0, 0.0]).is_none());
    }
}
