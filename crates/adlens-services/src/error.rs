//! Provider client errors

use thiserror::Error;

/// Errors surfaced by the provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request failed: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("File did not become active after {attempts} status checks")]
    ActivationTimeout { attempts: u32 },

    #[error("File processing failed with state {state}")]
    ProcessingFailed { state: String },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(&'static str),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
