//! Configuration module for TierPlace
//!
//! Provides configuration management including CLI arguments,
//! config files, and the static tier description.

mod settings;

pub use settings::*;
