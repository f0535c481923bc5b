//! Event sources feeding the pipeline: the live feed subscription and the
//! offline journal file replay.

pub mod feed;
pub mod replay;
