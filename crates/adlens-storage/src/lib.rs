//! Adlens Storage Library
//!
//! This crate provides blob persistence and upload-grant signing for Adlens.
//! Blobs live on the local filesystem behind the [`BlobStorage`] trait, and
//! upload grants are HMAC-signed tokens that authorize direct client uploads
//! against the blob routes.
//!
//! # Pathname format
//!
//! Blob pathnames are relative paths like `videos/demo.mp4`. They must not
//! contain `..` or a leading `/`. Sanitation is centralized in the `keys`
//! module so handlers and the backend stay consistent.

pub mod keys;
pub mod local;
pub mod token;
pub mod traits;

// Re-export commonly used types
pub use local::LocalBlobStorage;
pub use token::{TokenError, TokenSigner, UploadGrant};
pub use traits::{BlobResult, BlobStorage, BlobStorageError};
