//! Pipeline core: relevance filtering, observation dedup, record shaping
//! and orchestration.

pub mod cache;
pub mod filter;
pub mod pipeline;
pub mod record;
