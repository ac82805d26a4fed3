use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DisplayFromStr, NoneAsEmptyString, SerializeDisplay};
use uuid::Uuid;

use crate::catalog;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    /// Gemini image generation (primary).
    #[default]
    Gemini,
    /// Freepik Imagen3 (secondary, asynchronous tasks).
    Freepik,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI",
            Provider::Freepik => "FREEPIK",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freepik structural options. Effects are catalog values; `None` means unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FreepikEffects {
    #[serde(default)]
    pub dominant_colors: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub lightning: Option<String>,
    #[serde(default)]
    pub framing: Option<String>,
}

impl FreepikEffects {
    /// Builds effects from raw form inputs: a comma-separated colour list and
    /// three selects where `none` or empty means unset.
    pub fn from_inputs(colors: &str, color: &str, lightning: &str, framing: &str) -> Option<Self> {
        let pick = |v: &str| {
            let v = v.trim();
            (!v.is_empty() && v != catalog::NO_EFFECT).then(|| v.to_string())
        };
        let effects = Self {
            dominant_colors: colors
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            color: pick(color),
            lightning: pick(lightning),
            framing: pick(framing),
        };
        (!effects.is_empty()).then_some(effects)
    }

    pub fn is_empty(&self) -> bool {
        self.dominant_colors.is_empty()
            && self.color.is_none()
            && self.lightning.is_none()
            && self.framing.is_none()
    }
}

/// Snapshot of the image form at the moment of preview or submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub brand_description: String,
    #[serde(default)]
    pub industry: Option<String>,
    pub style_preset: String,
    #[serde(default)]
    pub custom_style_notes: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub aspect_ratio: String,
    pub number_of_images: u8,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub effects: Option<FreepikEffects>,
    #[serde(default)]
    pub use_example_image: bool,
}

impl GenerationRequest {
    /// Preset plus custom notes, joined the way the studio displays them.
    pub fn resolved_style(&self) -> String {
        match self.custom_style_notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => format!("{}. {}", self.style_preset, notes),
            _ => self.style_preset.clone(),
        }
    }

    /// Industry value with the "no industry" sentinel folded to `None`.
    pub fn industry_value(&self) -> Option<&str> {
        self.industry
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty() && *i != catalog::NO_INDUSTRY)
    }
}

/// Form-encoded image request, as posted to `/api/compose`.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationForm {
    pub brand_description: String,
    #[serde(default)]
    pub industry: String,
    pub image_style_preset: String,
    #[serde(default)]
    pub custom_style_notes: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde_as(as = "DisplayFromStr")]
    pub number_of_images: u8,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub freepik_dominant_colors_input: String,
    #[serde(default)]
    pub freepik_effect_color: String,
    #[serde(default)]
    pub freepik_effect_lightning: String,
    #[serde(default)]
    pub freepik_effect_framing: String,
    #[serde(default)]
    pub use_example_image: bool,
    #[serde(default)]
    pub example_image: String,
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

impl GenerationForm {
    /// Splits the form into the request snapshot and the optional example image.
    pub fn into_request(self) -> (GenerationRequest, Option<String>) {
        let effects = match self.provider {
            Provider::Freepik => FreepikEffects::from_inputs(
                &self.freepik_dominant_colors_input,
                &self.freepik_effect_color,
                &self.freepik_effect_lightning,
                &self.freepik_effect_framing,
            ),
            Provider::Gemini => None,
        };
        let aspect_ratio = if self.aspect_ratio.trim().is_empty() {
            catalog::default_aspect_ratio(self.provider).to_string()
        } else {
            self.aspect_ratio
        };
        let request = GenerationRequest {
            brand_description: self.brand_description,
            industry: non_empty(self.industry),
            style_preset: self.image_style_preset,
            custom_style_notes: non_empty(self.custom_style_notes),
            negative_prompt: non_empty(self.negative_prompt),
            aspect_ratio,
            number_of_images: self.number_of_images,
            seed: self.seed,
            provider: self.provider,
            effects,
            use_example_image: self.use_example_image,
        };
        (request, non_empty(self.example_image))
    }
}

/// Fields handed to the generation boundary, form-encoded.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub finalized_text_prompt: String,
    pub provider: Provider,
    pub brand_description: String,
    #[serde(default)]
    pub industry: String,
    pub image_style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_image: Option<String>,
    pub aspect_ratio: String,
    #[serde_as(as = "DisplayFromStr")]
    pub number_of_images: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Comma-separated hex codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freepik_dominant_colors_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freepik_effect_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freepik_effect_lightning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freepik_effect_framing: Option<String>,
}

impl GenerationPayload {
    pub fn dominant_colors(&self) -> Vec<&str> {
        self.freepik_dominant_colors_input
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }
}

const HOSTED_PREFIX: &str = "image_url:";
const PENDING_PREFIX: &str = "task_id:";

/// One entry in a generation result list.
#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum ResultMarker {
    /// A complete `data:` URI.
    Inline(String),
    /// An externally hosted image URL.
    Hosted(String),
    /// An asynchronous provider task that has not resolved yet.
    Pending(String),
}

impl ResultMarker {
    /// Image source usable for display, if the marker has one.
    pub fn display_src(&self) -> Option<&str> {
        match self {
            ResultMarker::Inline(uri) => Some(uri),
            ResultMarker::Hosted(url) => Some(url),
            ResultMarker::Pending(_) => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            ResultMarker::Pending(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ResultMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultMarker::Inline(uri) => f.write_str(uri),
            ResultMarker::Hosted(url) => write!(f, "{HOSTED_PREFIX}{url}"),
            ResultMarker::Pending(id) => write!(f, "{PENDING_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized result marker: {0}")]
pub struct UnknownMarker(String);

impl FromStr for ResultMarker {
    type Err = UnknownMarker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("data:") {
            Ok(ResultMarker::Inline(s.to_string()))
        } else if let Some(url) = s.strip_prefix(HOSTED_PREFIX) {
            Ok(ResultMarker::Hosted(url.to_string()))
        } else if let Some(id) = s.strip_prefix(PENDING_PREFIX) {
            Ok(ResultMarker::Pending(id.to_string()))
        } else if s.starts_with("https://") || s.starts_with("http://") {
            Ok(ResultMarker::Hosted(s.to_string()))
        } else {
            let shown: String = s.chars().take(40).collect();
            Err(UnknownMarker(shown))
        }
    }
}

/// What the generation boundary returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutput {
    pub generated_images: Vec<ResultMarker>,
    pub prompt_used: String,
    pub provider_used: Provider,
}

#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum TaskState {
    Completed,
    InProgress,
    Failed,
    Other(String),
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Completed => f.write_str("COMPLETED"),
            TaskState::InProgress => f.write_str("IN_PROGRESS"),
            TaskState::Failed => f.write_str("FAILED"),
            TaskState::Other(s) => f.write_str(s),
        }
    }
}

impl FromStr for TaskState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "COMPLETED" => TaskState::Completed,
            "IN_PROGRESS" => TaskState::InProgress,
            "FAILED" => TaskState::Failed,
            other => TaskState::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedAsset {
    pub id: Uuid,
    pub src: String,
    pub prompt: String,
    pub style: String,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
}

impl GeneratedAsset {
    pub fn new(src: impl Into<String>, prompt: impl Into<String>, style: impl Into<String>, provider: Provider) -> Self {
        Self {
            id: Uuid::new_v4(),
            src: src.into(),
            prompt: prompt.into(),
            style: style.into(),
            provider,
            created_at: Utc::now(),
        }
    }
}

/// Brand attributes a session is seeded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrandProfile {
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub brand_description: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub image_style_notes: String,
    /// Example images as `data:` URIs or URLs.
    #[serde(default)]
    pub example_images: Vec<String>,
    #[serde(default)]
    pub target_keywords: String,
    #[serde(default)]
    pub website_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SocialImageChoice {
    /// First displayable image of the last generation.
    Generated,
    /// An example image from the brand profile.
    Profile { index: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialPostRequest {
    #[serde(default)]
    pub image: Option<SocialImageChoice>,
    #[serde(default)]
    pub image_description: String,
    #[serde(default = "default_social_tone")]
    pub tone: String,
    #[serde(default)]
    pub custom_tone_nuances: String,
    #[serde(default)]
    pub brand_description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

fn default_social_tone() -> String {
    "professional".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialPost {
    pub id: Uuid,
    pub platform: String,
    pub image_src: Option<String>,
    pub image_description: String,
    pub caption: String,
    pub hashtags: String,
    pub tone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BlogPlatform {
    #[default]
    Medium,
    Other,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BlogOutlineRequest {
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub brand_description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogOutline {
    pub outline: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlogPostRequest {
    #[serde(flatten)]
    pub brief: BlogOutlineRequest,
    pub outline: String,
    #[serde(default = "default_blog_tone")]
    pub tone: String,
    #[serde(default)]
    pub platform: BlogPlatform,
}

fn default_blog_tone() -> String {
    catalog::BLOG_TONES[0].value.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: String,
    pub platform: BlogPlatform,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn markers_keep_their_prefixes() {
        let hosted: ResultMarker = "image_url:https://cdn.example/a.png".parse().unwrap();
        assert_eq!(hosted, ResultMarker::Hosted("https://cdn.example/a.png".into()));
        assert_eq!(hosted.to_string(), "image_url:https://cdn.example/a.png");

        let pending: ResultMarker = "task_id:abc-123".parse().unwrap();
        assert_eq!(pending.task_id(), Some("abc-123"));
        assert_eq!(pending.display_src(), None);

        assert!("ftp://nope".parse::<ResultMarker>().is_err());
    }

    #[test]
    fn markers_serialize_as_plain_strings() {
        let json = serde_json::to_string(&vec![
            ResultMarker::Inline("data:image/png;base64,AAAA".into()),
            ResultMarker::Pending("t1".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"["data:image/png;base64,AAAA","task_id:t1"]"#);
    }

    #[test]
    fn task_state_keeps_unknown_statuses() {
        let status: TaskStatus =
            serde_json::from_str(r#"{"task_id":"t","status":"CREATED"}"#).unwrap();
        assert_eq!(status.status, TaskState::Other("CREATED".into()));
        assert!(status.images.is_empty());
    }

    #[test]
    fn resolved_style_joins_notes() {
        let mut req = GenerationRequest {
            brand_description: "x".into(),
            industry: Some("_none_".into()),
            style_preset: "Minimalist".into(),
            custom_style_notes: Some("clean lines".into()),
            negative_prompt: None,
            aspect_ratio: "1:1".into(),
            number_of_images: 1,
            seed: None,
            provider: Provider::Gemini,
            effects: None,
            use_example_image: false,
        };
        assert_eq!(req.resolved_style(), "Minimalist. clean lines");
        assert_eq!(req.industry_value(), None);
        req.custom_style_notes = Some("  ".into());
        assert_eq!(req.resolved_style(), "Minimalist");
    }

    #[test]
    fn effects_ignore_none_selections() {
        assert_eq!(FreepikEffects::from_inputs("", "none", "", "none"), None);
        let effects = FreepikEffects::from_inputs("#112233, #AABBCC,", "pastel", "none", "macro").unwrap();
        assert_eq!(effects.dominant_colors, vec!["#112233", "#AABBCC"]);
        assert_eq!(effects.color.as_deref(), Some("pastel"));
        assert_eq!(effects.lightning, None);
    }
}
