//! Analysis orchestration shared by the HTTP handlers.

pub mod analysis;
