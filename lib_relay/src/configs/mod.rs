//! Configuration loading for the relay.

pub mod settings;
