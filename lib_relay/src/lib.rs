// Declare the modules to re-export
pub mod configs;
pub mod core;
pub mod ingestors;
pub mod journal;
pub mod loggers;
pub mod retrieve;

// Re-export the types callers actually assemble
pub use crate::configs::settings::{ConfigError, Settings};
pub use crate::core::cache::ObservationCache;
pub use crate::core::filter::{InterestVolume, RelevanceFilter};
pub use crate::core::pipeline::{Disposition, Pipeline};
pub use crate::core::record::{OutputRecord, RecordBuilder};
pub use crate::journal::event::{EventError, Faction, JournalEvent};
pub use crate::retrieve::sheet::{DeliveryOutcome, SheetClient};
