use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    composer::ComposedPrompt,
    config::DEMO_KEY,
    error::ProviderError,
    models::ResultMarker,
    normalizer::InlineImage,
};

const IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
const TEXT_MODEL: &str = "gemini-2.0-flash";

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

/// Short, log-safe rendering of a possibly huge string.
pub fn preview(s: &str) -> String {
    if s.len() > 50 {
        let head: String = s.chars().take(50).collect();
        format!("{}...[{} chars total]", head, s.len())
    } else {
        s.to_string()
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    async fn perform_api_call(&self, model: &str, parts: Vec<Value>, generation_config: Value) -> Result<GeminiResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key);
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let mut request_body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        });

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            truncate_base64_in_json(&mut request_body);
            error!("❌ Gemini API error {} for request {}: {}", status, request_body, error_body);
            return Err(ProviderError::Api { status: status.as_u16(), body: error_body });
        }

        let response_text = response.text().await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        // Truncate base64 image data for cleaner logging
        let truncated_response = if response_text.len() > 1000 {
            if let Ok(mut json_value) = serde_json::from_str::<Value>(&response_text) {
                truncate_base64_in_json(&mut json_value);
                json_value.to_string()
            } else {
                preview(&response_text)
            }
        } else {
            response_text.clone()
        };
        info!("📥 Raw Gemini API response: {}", truncated_response);

        serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::Parse(format!("{}: {}", e, preview(&response_text))))
    }

    /// Generates one image and returns it as a `data:` URI.
    pub async fn generate_image(&self, prompt: &str, reference: Option<&InlineImage>) -> Result<String, ProviderError> {
        if self.demo_mode() {
            info!("Using demo mode - no real images generated");
            let placeholder = generate_placeholder_image(prompt);
            info!("📦 Generated placeholder image: {}", preview(&placeholder));
            return Ok(placeholder);
        }

        let mut parts = vec![json!({ "text": prompt })];
        if let Some(image) = reference {
            parts.push(json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.base64() }
            }));
        }
        let parsed = self.perform_api_call(IMAGE_MODEL, parts, json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "temperature": 0.4,
            "topP": 0.95,
            "topK": 64,
            "candidateCount": 1
        })).await?;

        let (mime_type, data) = extract_first_image(&parsed)
            .ok_or_else(|| ProviderError::Other("no image data in response".into()))?;
        info!("🖼️ Extracted {} image from API response: {}", mime_type, preview(&data));
        Ok(format!("data:{};base64,{}", mime_type, data))
    }

    /// One call per image; each call gets the batch clause for its own index.
    pub async fn generate_images(&self, prompt: &ComposedPrompt, reference: Option<&InlineImage>) -> Result<Vec<ResultMarker>, ProviderError> {
        let total = prompt.batch_size().max(1);
        let mut markers = Vec::with_capacity(total as usize);
        for index in 1..=total {
            let per_image = prompt.for_image(index);
            info!("🎯 Generating image {}/{} with prompt: {}", index, total, preview(&per_image));
            let uri = self.generate_image(&per_image, reference).await?;
            markers.push(ResultMarker::Inline(uri));
        }
        info!("✅ Generated {} image(s)", markers.len());
        Ok(markers)
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.demo_mode() {
            info!("Using demo mode - generating fallback text");
            return Ok(demo_text(prompt));
        }

        info!("Generating text with Gemini API...");
        let parsed = self.perform_api_call(TEXT_MODEL, vec![json!({ "text": prompt })], json!({
            "temperature": 0.7,
            "topK": 40,
            "topP": 0.95,
            "maxOutputTokens": 2048
        })).await?;

        extract_first_text(&parsed)
            .ok_or_else(|| ProviderError::Other("No text content found in response".to_string()))
    }

    /// Short visual description of an image, used to steer text-only providers.
    pub async fn describe_image(&self, image: &InlineImage) -> Result<String, ProviderError> {
        if self.demo_mode() {
            return Ok("A clean product shot on a neutral background.".to_string());
        }
        let instruction = "Describe this image in two or three sentences for an image-generation prompt. Focus on the main subject, setting, colours, lighting and mood. Do not mention that it is a photo or an image.";
        let parts = vec![
            json!({ "text": instruction }),
            json!({ "inlineData": { "mimeType": image.mime_type, "data": image.base64() } }),
        ];
        let parsed = self.perform_api_call(TEXT_MODEL, parts, json!({ "temperature": 0.4, "maxOutputTokens": 300 })).await?;
        let description = extract_first_text(&parsed)
            .ok_or_else(|| ProviderError::Other("No description returned for example image".to_string()))?;
        info!("🖼️ Example image described ({} chars)", description.len());
        Ok(description)
    }
}

fn generate_placeholder_image(prompt: &str) -> String {
    let palette = ["#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6"];
    let color = palette[prompt.len() % palette.len()];
    let svg = format!(r#"<svg width="512" height="512" xmlns="http://www.w3.org/2000/svg">
            <defs>
                <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
                    <stop offset="0%" style="stop-color:{color};stop-opacity:1" />
                    <stop offset="100%" style="stop-color:{color};stop-opacity:0.6" />
                </linearGradient>
            </defs>
            <rect width="512" height="512" fill="url(#grad)" />
            <text x="256" y="250" font-family="Arial, sans-serif" font-size="28" font-weight="bold"
                  text-anchor="middle" fill="white">BrandForge Preview</text>
            <text x="256" y="290" font-family="Arial, sans-serif" font-size="14"
                  text-anchor="middle" fill="white" opacity="0.8">Demo mode placeholder</text>
        </svg>"#);

    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
    )
}

fn demo_text(prompt: &str) -> String {
    if prompt.contains("\"caption\"") {
        json!({
            "caption": "Demo caption: small daily rituals, made kinder to the planet. ✨",
            "hashtags": "#demo #brandforge #sustainable"
        })
        .to_string()
    } else if prompt.contains("\"title\"") {
        json!({
            "title": "Demo Post: Why Your Brand Story Matters",
            "content": "This is demo blog content generated without an API key.",
            "tags": "demo, branding, marketing"
        })
        .to_string()
    } else {
        "1. Introduction\n2. The Problem\n3. Our Approach\n4. Conclusion".to_string()
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    // keeps unknown part kinds from failing the whole response
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn extract_first_image(resp: &GeminiResponse) -> Option<(String, String)> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Inline { inline_data } = p {
                return Some((inline_data.mime_type.clone(), inline_data.data.clone()));
            }
        }
    }
    info!("⚠️ No inline image data found in response structure");
    None
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p {
            Part::Text { text } => Some(text.trim().to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn demo_client() -> GeminiClient {
        GeminiClient::new(DEMO_KEY.into(), "http://localhost".into())
    }

    #[test]
    fn parses_inline_and_text_parts() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "  here you go " },
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo" } },
                { "functionCall": { "name": "x" } }
            ]}}]
        }))
        .unwrap();
        assert_eq!(extract_first_image(&resp), Some(("image/png".into(), "iVBORw0KGgo".into())));
        assert_eq!(extract_first_text(&resp).as_deref(), Some("here you go"));
    }

    #[test]
    fn truncates_long_base64_for_logs() {
        let mut v = json!({ "inlineData": { "data": "A".repeat(200) } });
        truncate_base64_in_json(&mut v);
        let data = v["inlineData"]["data"].as_str().unwrap();
        assert!(data.ends_with("[truncated 150 chars]"));
    }

    #[tokio::test]
    async fn demo_mode_returns_one_placeholder_per_image() {
        let prompt = ComposedPrompt::new("anything", 3);
        let markers = demo_client().generate_images(&prompt, None).await.unwrap();
        assert_eq!(markers.len(), 3);
        assert!(markers
            .iter()
            .all(|m| matches!(m, ResultMarker::Inline(uri) if uri.starts_with("data:image/svg+xml;base64,"))));
    }
}
