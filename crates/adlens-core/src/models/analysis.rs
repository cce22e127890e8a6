use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::media_type::MediaKind;

/// Generated marketing copy pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdCopy {
    pub headline: String,
    pub description: String,
}

impl AdCopy {
    /// Static copy used when generation and recovery both come up empty.
    pub fn fallback() -> Self {
        Self {
            headline: "Discover Something Amazing".to_string(),
            description: "Check out this incredible ad that will capture your attention."
                .to_string(),
        }
    }
}

/// Analysis result for a video submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub transcript: String,
    pub description: String,
    pub scenes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_ad_copy: Option<AdCopy>,
}

/// Analysis result for an image submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub description: String,
    pub ad_copy: Vec<String>,
    pub visual_elements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_ad_copy: Option<AdCopy>,
}

/// Either analysis payload. The wire shape carries no discriminator;
/// the variants are told apart by their required fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MediaAnalysis {
    Video(VideoAnalysis),
    Image(ImageAnalysis),
}

impl MediaAnalysis {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaAnalysis::Video(_) => MediaKind::Video,
            MediaAnalysis::Image(_) => MediaKind::Image,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            MediaAnalysis::Video(v) => &v.description,
            MediaAnalysis::Image(i) => &i.description,
        }
    }

    pub fn claude_ad_copy(&self) -> Option<&AdCopy> {
        match self {
            MediaAnalysis::Video(v) => v.claude_ad_copy.as_ref(),
            MediaAnalysis::Image(i) => i.claude_ad_copy.as_ref(),
        }
    }

    /// Attach the enrichment result without touching any primary field.
    pub fn set_claude_ad_copy(&mut self, copy: AdCopy) {
        match self {
            MediaAnalysis::Video(v) => v.claude_ad_copy = Some(copy),
            MediaAnalysis::Image(i) => i.claude_ad_copy = Some(copy),
        }
    }
}

/// Lifecycle of one submission. A completed item structurally carries
/// its result; an error item carries only the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemState {
    Pending,
    Processing,
    Completed { result: MediaAnalysis },
    Error { error: String },
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Completed { .. } | ItemState::Error { .. })
    }
}

/// Persisted record of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisItem {
    pub id: Uuid,
    /// Creation time, serialized as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(flatten)]
    pub state: ItemState,
}

impl AnalysisItem {
    pub fn new(file_name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            file_name: file_name.into(),
            kind,
            state: ItemState::Pending,
        }
    }

    pub fn start_processing(&mut self) {
        self.state = ItemState::Processing;
    }

    pub fn complete(&mut self, result: MediaAnalysis) {
        self.state = ItemState::Completed { result };
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = ItemState::Error {
            error: error.into(),
        };
    }
}
