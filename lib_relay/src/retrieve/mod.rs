//! HTTP delivery to the spreadsheet sink.

pub mod sheet;
