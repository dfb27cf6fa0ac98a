//! # Configuration Modules
//!
//! Built-in defaults, an optional JSON file and command line / environment
//! overrides, merged in that order into a resolved [`Settings`].

/// Layered pipeline configuration.
pub mod config_sys;

pub use config_sys::{Config, Settings, load_settings};
