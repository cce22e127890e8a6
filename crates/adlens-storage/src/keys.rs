//! Blob pathname helpers.
//!
//! Pathnames are relative paths like `videos/demo.mp4`. Sanitation happens
//! once here so the upload handshake, the blob routes, and the backend all
//! agree on what a valid pathname looks like.

use crate::traits::{BlobResult, BlobStorageError};

const MAX_SEGMENT_LENGTH: usize = 255;
const SUFFIX_BYTES: usize = 8;

/// Sanitize a client-supplied pathname into a safe relative blob path.
/// Directory separators are preserved; each segment is cleaned individually.
/// Returns an error if the pathname is empty or contains path traversal.
pub fn sanitize_pathname(pathname: &str) -> BlobResult<String> {
    let trimmed = pathname.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(BlobStorageError::InvalidPathname(
            "Blob pathname is empty".to_string(),
        ));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment.contains("..") {
            return Err(BlobStorageError::InvalidPathname(
                "Blob pathname contains invalid path traversal".to_string(),
            ));
        }

        let cleaned: String = segment
            .chars()
            .take(MAX_SEGMENT_LENGTH)
            .map(|c| {
                if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        segments.push(cleaned);
    }

    Ok(segments.join("/"))
}

/// Append a random suffix before the file extension so repeated uploads of
/// the same filename never collide: `demo.mp4` -> `demo-1f8a0c92d3b45e67.mp4`.
pub fn with_random_suffix(pathname: &str) -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..SUFFIX_BYTES).map(|_| rng.random()).collect();
    let suffix = hex::encode(random_bytes);

    match pathname.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => {
            format!("{}-{}.{}", stem, suffix, ext)
        }
        _ => format!("{}-{}", pathname, suffix),
    }
}
