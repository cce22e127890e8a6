//! Adlens Core Library
//!
//! This crate provides the domain models, configuration, and media-type
//! helpers shared across all adlens components.

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use models::*;
