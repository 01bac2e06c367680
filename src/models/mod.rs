//! Data Models
//!
//! Contains the configuration structures used throughout the analyzer.

pub mod settings;

pub use settings::*;
