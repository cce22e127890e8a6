//! Adlens Services Library
//!
//! Provider clients for media understanding and ad-copy generation,
//! along with the recovery parser that turns loosely formatted model
//! output into fully populated results.

pub mod anthropic;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod prompts;

// Re-export commonly used types
pub use anthropic::{AnthropicConfig, AnthropicService};
pub use error::{ProviderError, ProviderResult};
pub use gemini::{FileState, GeminiConfig, GeminiService, PollConfig, RemoteFile};
