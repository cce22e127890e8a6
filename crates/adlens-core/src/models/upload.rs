use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON body accepted by the analyze endpoint when the media was staged
/// out of band (blob store or provider file API).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Blob URL to fetch the media from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    /// Provider file URI that is already active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<String>,
    /// MIME type of the media.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Original filename, used for temp naming and display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Events accepted by the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "payload")]
pub enum UploadEvent {
    /// Client requests a scoped token for a direct blob upload.
    #[serde(rename = "blob.generate-client-token")]
    GenerateClientToken(TokenRequestPayload),
    /// Blob store calls back once the upload landed.
    #[serde(rename = "blob.upload-completed")]
    UploadCompleted(UploadCompletedPayload),
}

/// Payload of a token request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestPayload {
    /// Pathname the client intends to upload to.
    pub pathname: String,
    /// Where the upload-completed event should be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Opaque client context echoed back in the completion callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_payload: Option<String>,
}

/// Payload of the completion callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletedPayload {
    pub blob: PutBlobResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_payload: Option<String>,
}

/// Response to a token request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenResponse {
    #[serde(rename = "type")]
    pub event_type: String,
    pub client_token: String,
}

/// Acknowledgement for the completion callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CallbackAck {
    pub response: String,
}

impl CallbackAck {
    pub fn ok() -> Self {
        Self {
            response: "ok".to_string(),
        }
    }
}

/// Stored-blob descriptor returned by the blob PUT and echoed in the
/// completion callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobResult {
    pub url: String,
    pub download_url: String,
    pub pathname: String,
    pub content_type: String,
    pub content_disposition: String,
}

/// Provider key exposure for clients that upload straight to the
/// provider's file API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigResponse {
    pub api_key: String,
}
