//! Upload grant signing and verification
//!
//! The upload handshake hands browsers a short-lived token authorizing a
//! direct PUT to the blob routes. Tokens are stateless: the grant itself is
//! carried in the token body and an HMAC signature keeps it tamper-proof.
//!
//! Token format: `<base64url(grant json)>.<hex hmac>`

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued upload grant stays valid (1 hour)
pub const UPLOAD_TOKEN_VALIDITY_SECS: i64 = 3600;

/// Upload token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed upload token")]
    Malformed,

    #[error("Upload token signature mismatch")]
    SignatureMismatch,

    #[error("Upload token expired")]
    Expired,

    #[error("Upload token crypto failure: {0}")]
    Crypto(String),
}

/// What an upload token authorizes
///
/// Issued during the upload handshake and checked again when the client
/// presents the token on the blob PUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    /// Pathname the client may write to
    pub pathname: String,
    /// Content types the upload may declare
    pub allowed_content_types: Vec<String>,
    /// Upper bound on the upload body size
    pub maximum_size_in_bytes: u64,
    /// Expiry as epoch milliseconds
    pub valid_until: i64,
    /// Whether the stored pathname gets a random suffix
    pub add_random_suffix: bool,
    /// Where the completion callback should be POSTed
    pub callback_url: Option<String>,
    /// Opaque client payload echoed back in the completion callback
    pub payload: Option<String>,
}

impl UploadGrant {
    /// Expiry timestamp for a grant issued now
    pub fn default_valid_until() -> i64 {
        Utc::now().timestamp_millis() + UPLOAD_TOKEN_VALIDITY_SECS * 1000
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.valid_until < now_ms
    }
}

/// Signs and verifies upload grants with an HMAC-SHA256 secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Serialize and sign a grant into a client token
    pub fn sign(&self, grant: &UploadGrant) -> Result<String, TokenError> {
        let json = serde_json::to_vec(grant).map_err(|e| TokenError::Crypto(e.to_string()))?;
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(json);
        let signature = self.signature_for(&encoded)?;
        Ok(format!("{}.{}", encoded, signature))
    }

    /// Verify a client token and recover the grant it carries
    ///
    /// Validates:
    /// 1. Token format (must have 2 parts: payload.signature)
    /// 2. HMAC signature matches the secret
    /// 3. Grant hasn't expired
    pub fn verify(&self, token: &str) -> Result<UploadGrant, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 2 {
            return Err(TokenError::Malformed);
        }

        let encoded = parts[0];
        let signature = parts[1];

        let expected = self.signature_for(encoded)?;

        // Constant-time comparison to prevent timing attacks
        use subtle::ConstantTimeEq;
        let matches: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        if !matches {
            return Err(TokenError::SignatureMismatch);
        }

        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed)?;
        let grant: UploadGrant =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if grant.is_expired(Utc::now().timestamp_millis()) {
            tracing::debug!(pathname = %grant.pathname, "Upload token expired");
            return Err(TokenError::Expired);
        }

        Ok(grant)
    }

    fn signature_for(&self, message: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| TokenError::Crypto(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
