//! Data models for the application
//!
//! Analysis results and their lifecycle, the media-kind discriminator,
//! and the wire types shared between the API server and its clients.

mod analysis;
mod media_type;
mod upload;

// Re-export all models for convenient imports
pub use analysis::*;
pub use media_type::*;
pub use upload::*;
