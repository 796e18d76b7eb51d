//! Configuration module for the validator.
//!
//! Handles loading and validating validator configuration from TOML files.

mod settings;

pub use settings::*;
