//! Recovery parsing for model output
//!
//! The providers are instructed to return strict JSON but drift into
//! fenced blocks, prose, or partial fragments. Every function here is
//! total: the result is always fully populated, with fixed placeholders
//! standing in for fields that cannot be recovered.

use adlens_core::{AdCopy, ImageAnalysis, VideoAnalysis};
use regex::Regex;
use serde::Deserialize;

/// Placeholder when no transcript can be recovered.
pub const FALLBACK_TRANSCRIPT: &str = "No transcript available";
/// Placeholder tagline when no ad-copy list can be recovered.
pub const FALLBACK_AD_COPY: &str = "Professional marketing copy for your brand";
/// Placeholder when no visual-element list can be recovered.
pub const FALLBACK_VISUAL_ELEMENT: &str = "Key visual elements identified";
/// Length of the raw-text snippet used for the single-scene fallback.
pub const SCENE_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
struct LooseVideo {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    scenes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LooseImage {
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "adCopy")]
    ad_copy: Option<Vec<String>>,
    #[serde(default, rename = "visualElements")]
    visual_elements: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LooseAdCopy {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Strip a markdown code fence, preferring a ```json block when one
/// exists. Text without fences passes through trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.contains("```json") {
        trimmed
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(trimmed)
            .trim()
    } else if trimmed.contains("```") {
        trimmed
            .split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(trimmed)
            .trim()
    } else {
        trimmed
    }
}

/// Parse model output into a video analysis. Fields present in valid
/// JSON are taken as-is; everything else is recovered from the raw
/// text or replaced with placeholders.
pub fn parse_video_analysis(text: &str) -> VideoAnalysis {
    let candidate = strip_code_fences(text);
    if let Ok(parsed) = serde_json::from_str::<LooseVideo>(candidate) {
        return VideoAnalysis {
            transcript: parsed
                .transcript
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_TRANSCRIPT.to_string()),
            description: parsed
                .description
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| text.trim().to_string()),
            scenes: parsed.scenes.unwrap_or_else(|| extract_scenes(text)),
            claude_ad_copy: None,
        };
    }

    VideoAnalysis {
        transcript: extract_section(text, "transcript")
            .unwrap_or_else(|| FALLBACK_TRANSCRIPT.to_string()),
        description: extract_section(text, "description")
            .unwrap_or_else(|| text.trim().to_string()),
        scenes: extract_scenes(text),
        claude_ad_copy: None,
    }
}

/// Parse model output into an image analysis. Same recovery discipline
/// as [`parse_video_analysis`].
pub fn parse_image_analysis(text: &str) -> ImageAnalysis {
    let candidate = strip_code_fences(text);
    if let Ok(parsed) = serde_json::from_str::<LooseImage>(candidate) {
        return ImageAnalysis {
            description: parsed
                .description
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| text.trim().to_string()),
            ad_copy: parsed.ad_copy.unwrap_or_else(|| {
                extract_array_section(text, "adCopy")
                    .unwrap_or_else(|| vec![FALLBACK_AD_COPY.to_string()])
            }),
            visual_elements: parsed.visual_elements.unwrap_or_else(|| {
                extract_array_section(text, "visualElements")
                    .unwrap_or_else(|| vec![FALLBACK_VISUAL_ELEMENT.to_string()])
            }),
            claude_ad_copy: None,
        };
    }

    ImageAnalysis {
        description: extract_section(text, "description")
            .unwrap_or_else(|| text.trim().to_string()),
        ad_copy: extract_array_section(text, "adCopy")
            .unwrap_or_else(|| vec![FALLBACK_AD_COPY.to_string()]),
        visual_elements: extract_array_section(text, "visualElements")
            .unwrap_or_else(|| vec![FALLBACK_VISUAL_ELEMENT.to_string()]),
        claude_ad_copy: None,
    }
}

/// Recover an ad-copy pair from model text. Unrecoverable fields fall
/// back to the static copy.
pub fn recover_ad_copy(text: &str) -> AdCopy {
    let candidate = strip_code_fences(text);
    let parsed: LooseAdCopy = serde_json::from_str(candidate).unwrap_or_default();
    let defaults = AdCopy::fallback();
    AdCopy {
        headline: parsed
            .headline
            .filter(|s| !s.trim().is_empty())
            .or_else(|| extract_section(text, "headline"))
            .unwrap_or(defaults.headline),
        description: parsed
            .description
            .filter(|s| !s.trim().is_empty())
            .or_else(|| extract_section(text, "description"))
            .unwrap_or(defaults.description),
    }
}

/// Pull a single named field out of non-JSON text. Tries a quoted JSON
/// fragment, then a `field: value` line, then a markdown heading block.
pub fn extract_section(text: &str, field: &str) -> Option<String> {
    if let Ok(re) = Regex::new(&format!(r#"(?i)"{field}"\s*:\s*"([^"]*)""#)) {
        if let Some(cap) = re.captures(text) {
            let value = cap[1].trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    if let Ok(re) = Regex::new(&format!(r"(?im)^\s*{field}\s*:\s*([^\n]+)")) {
        if let Some(cap) = re.captures(text) {
            let value = cap[1].trim().trim_matches('"').to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    if let Ok(re) = Regex::new(&format!(r"(?is)#{{1,2}}\s*{field}[:\s]+([^#]+)")) {
        if let Some(cap) = re.captures(text) {
            let value = cap[1].trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    None
}

/// Pull a named list out of non-JSON text. Tries a JSON array literal
/// after the field name, then a bulleted or numbered block following
/// the field mention, one item per non-empty line with the list marker
/// stripped.
pub fn extract_array_section(text: &str, field: &str) -> Option<Vec<String>> {
    if let Ok(re) = Regex::new(&format!(r#"(?is)"?{field}"?\s*:\s*\[(.*?)\]"#)) {
        if let Some(cap) = re.captures(text) {
            let inner = &cap[1];
            if let Ok(items) = serde_json::from_str::<Vec<String>>(&format!("[{inner}]")) {
                let items: Vec<String> = items
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if !items.is_empty() {
                    return Some(items);
                }
            }
            let items: Vec<String> = inner
                .split(',')
                .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !items.is_empty() {
                return Some(items);
            }
        }
    }

    let field_re = Regex::new(&format!(r"(?i){field}")).ok()?;
    let after = &text[field_re.find(text)?.end()..];
    let marker_re = Regex::new(r"^(?:[-*•]|\d+[.)])\s+(.+)$").ok()?;

    let mut items = Vec::new();
    for line in after.lines() {
        let line = line.trim();
        if line.is_empty() {
            if items.is_empty() {
                continue;
            }
            break;
        }
        match marker_re.captures(line) {
            Some(cap) => {
                let item = cap[1].trim().to_string();
                if !item.is_empty() {
                    items.push(item);
                }
            }
            None if items.is_empty() => continue,
            None => break,
        }
    }

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Recover a scene list: a `scenes` array or list block, then
/// `Scene N:` / `Segment N:` lines, then a single entry built from the
/// leading raw-text snippet.
pub fn extract_scenes(text: &str) -> Vec<String> {
    if let Some(scenes) = extract_array_section(text, "scenes") {
        return scenes;
    }

    if let Ok(re) = Regex::new(r"(?i)(?:scene|segment)\s*\d+\s*[:.]?\s*([^\n]+)") {
        let scenes: Vec<String> = re
            .captures_iter(text)
            .map(|cap| cap[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !scenes.is_empty() {
            return scenes;
        }
    }

    let snippet: String = text.trim().chars().take(SCENE_SNIPPET_CHARS).collect();
    vec![format!("Main scene: {snippet}")]
}
