//! Prompt templates sent to the providers

/// Instruction for the video analysis call. The recovery parser keys
/// off the field names used here.
pub const VIDEO_ANALYSIS_PROMPT: &str = r#"Analyze this video advertisement and return a JSON object with exactly these fields:
{
  "transcript": "Full transcript of all spoken words and narration",
  "description": "Detailed description of the video content, style, and message",
  "scenes": ["Scene 1: ...", "Scene 2: ..."]
}
Return only the JSON object, without markdown fences or commentary."#;

/// Instruction for the image analysis call.
pub const IMAGE_ANALYSIS_PROMPT: &str = r#"Analyze this image advertisement and return a JSON object with exactly these fields:
{
  "description": "Detailed description of the image content and composition",
  "adCopy": ["Three to five short marketing taglines suited to the image"],
  "visualElements": ["Notable visual elements such as colors, objects, typography, and layout"]
}
Return only the JSON object, without markdown fences or commentary."#;

const AD_COPY_TEMPLATE: &str = r#"You are a direct-response copywriter. Using the media analysis below, write ad copy for the product or service shown.

Audience: assume prospects are problem-aware but not product-aware. Meet them at their current stage of awareness and move them one step forward.

Structure the description with a Problem-Solution format:
1. Open on the concrete problem the viewer recognizes in their own life.
2. Agitate briefly with the cost of leaving it unsolved.
3. Present the product as the solution and name what makes it credible.
4. Close with a clear next step.

Rules:
- Headline: maximum 40 characters, no quotes, no exclamation marks.
- Description: 400 to 600 characters, plain sentences, no bullet points.
- Do not invent product claims that the analysis does not support.
- You may use web search to check common objections in the product category.

Record the result with the ad_copy tool, or respond with a JSON object: {"headline": "...", "description": "..."}"#;

/// Build the copy-generation prompt from the analysis content.
/// Transcript and scenes are included only when present.
pub fn ad_copy_prompt(description: &str, transcript: Option<&str>, scenes: &[String]) -> String {
    let mut prompt = String::from(AD_COPY_TEMPLATE);
    prompt.push_str("\n\nMedia analysis:\n");
    prompt.push_str(&format!("Description: {description}\n"));
    if let Some(transcript) = transcript.filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("Transcript: {transcript}\n"));
    }
    if !scenes.is_empty() {
        prompt.push_str("Scenes:\n");
        for scene in scenes {
            prompt.push_str(&format!("- {scene}\n"));
        }
    }
    prompt
}
