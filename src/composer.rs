//! Prompt and payload composition for image generation.
//!
//! Everything here is a pure function of a [`GenerationRequest`] snapshot;
//! nothing is dispatched until the caller hands the payload to a backend.

use serde::Serialize;
use thiserror::Error;

use crate::{
    catalog,
    models::{GenerationPayload, GenerationRequest, Provider},
};

pub const MAX_IMAGES_PER_BATCH: u8 = 4;

pub const COMPOSITION_GUIDANCE: &str = "IMPORTANT COMPOSITION RULE: When depicting human figures as the primary subject, the image *must* be well-composed. Avoid awkward or unintentional cropping of faces or key body parts. Ensure the figure is presented naturally and fully within the frame, unless the prompt *explicitly* requests a specific framing like 'close-up', 'headshot', 'upper body shot', or an artistic crop. Prioritize showing the entire subject if it's a person.";

/// First line of a Freepik prompt built around a reference image. The backend
/// swaps it for a generated description of that image.
pub const REFERENCE_DESCRIPTION_PLACEHOLDER: &str = "[An AI-generated description of your example image will be used here by the backend to guide content when Freepik/Imagen3 is selected.]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Please provide a brand description to generate images.")]
    MissingBrandDescription,
    #[error("Please select an image style preset.")]
    MissingImageStyle,
    #[error("number of images must be between 1 and {MAX_IMAGES_PER_BATCH}, got {0}")]
    InvalidImageCount(u8),
    #[error("aspect ratio '{ratio}' is not offered by {provider}")]
    InvalidAspectRatio { provider: Provider, ratio: String },
    #[error("'{0}' is not a hex colour such as #1A2B3C")]
    InvalidColor(String),
    #[error("unknown {kind} effect '{value}'")]
    InvalidEffect { kind: &'static str, value: String },
}

/// The generation prompt. Batch requests carry a per-image variation clause
/// which [`ComposedPrompt::for_image`] re-targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPrompt {
    text: String,
    batch_size: u8,
}

impl ComposedPrompt {
    pub fn new(text: impl Into<String>, batch_size: u8) -> Self {
        Self { text: text.into(), batch_size }
    }

    /// The prompt as previewed and submitted (image 1 of the batch).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn batch_size(&self) -> u8 {
        self.batch_size
    }

    /// Prompt for the 1-based `index` within the batch.
    pub fn for_image(&self, index: u8) -> String {
        retarget_batch_clause(&self.text, index, self.batch_size)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedSubmission {
    pub prompt: ComposedPrompt,
    pub payload: GenerationPayload,
}

/// Validates the snapshot and builds the prompt and outbound payload.
///
/// `example_image` is only used as a reference when the request opts in.
pub fn compose(
    request: &GenerationRequest,
    example_image: Option<&str>,
) -> Result<ComposedSubmission, ComposeError> {
    validate(request)?;
    let reference = example_image
        .map(str::trim)
        .filter(|img| request.use_example_image && !img.is_empty());

    let prompt = compose_prompt(request, reference.is_some());
    let payload = build_payload(request, reference, prompt.text());
    Ok(ComposedSubmission { prompt, payload })
}

/// Checks the invariants a submission must satisfy before dispatch.
pub fn validate(request: &GenerationRequest) -> Result<(), ComposeError> {
    if request.brand_description.trim().is_empty() {
        return Err(ComposeError::MissingBrandDescription);
    }
    if request.resolved_style().trim().is_empty() {
        return Err(ComposeError::MissingImageStyle);
    }
    check_batch(request.provider, request.number_of_images, &request.aspect_ratio)?;
    if let Some(effects) = &request.effects {
        if let Some(bad) = effects.dominant_colors.iter().find(|c| !is_hex_color(c)) {
            return Err(ComposeError::InvalidColor(bad.clone()));
        }
        let checks = [
            ("color", &effects.color, catalog::FREEPIK_EFFECT_COLORS),
            ("lightning", &effects.lightning, catalog::FREEPIK_EFFECT_LIGHTNINGS),
            ("framing", &effects.framing, catalog::FREEPIK_EFFECT_FRAMINGS),
        ];
        for (kind, value, options) in checks {
            if let Some(value) = value {
                if !catalog::contains(options, value) {
                    return Err(ComposeError::InvalidEffect { kind, value: value.clone() });
                }
            }
        }
    }
    Ok(())
}

/// Bounds a pre-composed payload must still satisfy before it reaches a provider.
pub fn validate_payload(payload: &GenerationPayload) -> Result<(), ComposeError> {
    check_batch(payload.provider, payload.number_of_images, &payload.aspect_ratio)
}

fn check_batch(provider: Provider, number_of_images: u8, aspect_ratio: &str) -> Result<(), ComposeError> {
    if !(1..=MAX_IMAGES_PER_BATCH).contains(&number_of_images) {
        return Err(ComposeError::InvalidImageCount(number_of_images));
    }
    if !catalog::is_valid_aspect_ratio(provider, aspect_ratio) {
        return Err(ComposeError::InvalidAspectRatio { provider, ratio: aspect_ratio.to_string() });
    }
    Ok(())
}

fn is_hex_color(c: &str) -> bool {
    c.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|ch| ch.is_ascii_hexdigit()))
}

/// Builds the prompt text. Assumes `request` already passed [`validate`].
pub fn compose_prompt(request: &GenerationRequest, has_reference: bool) -> ComposedPrompt {
    let text = match request.provider {
        Provider::Freepik => freepik_prompt(request, has_reference),
        Provider::Gemini => gemini_prompt(request, has_reference),
    };
    ComposedPrompt::new(text, request.number_of_images)
}

fn industry_context(request: &GenerationRequest) -> String {
    let Some(value) = request.industry_value() else {
        return String::new();
    };
    let label = catalog::label_or_value(catalog::INDUSTRIES, value);
    if label == catalog::NO_INDUSTRY_LABEL {
        return String::new();
    }
    format!(" The brand operates in the {label} industry.")
}

/// The Freepik style named by the preset's leading keyword, if any.
pub fn freepik_structural_style(preset: &str) -> Option<&'static str> {
    let lowered = preset.to_lowercase();
    let first = lowered
        .trim()
        .split(" - ")
        .next()
        .and_then(|s| s.split([',', '.']).next())
        .unwrap_or_default()
        .trim();
    catalog::FREEPIK_VALID_STYLES
        .iter()
        .find(|s| s.eq_ignore_ascii_case(first))
        .copied()
}

/// Whether Freepik applies the preset itself rather than via prompt text.
pub fn is_structural_freepik_style(preset: &str) -> bool {
    freepik_structural_style(preset).is_some()
}

fn freepik_prompt(request: &GenerationRequest, has_reference: bool) -> String {
    let desc = &request.brand_description;
    let mut prompt = if has_reference {
        format!(
            "{REFERENCE_DESCRIPTION_PLACEHOLDER}\nUsing that description as primary inspiration for the subject and main visual elements, now generate an image based on the following concept: \"{desc}\"."
        )
    } else {
        format!("Generate an image based on the concept: \"{desc}\".")
    };
    prompt.push_str(&industry_context(request));

    if is_structural_freepik_style(&request.style_preset) {
        let label = catalog::label_or_value(catalog::IMAGE_STYLE_PRESETS, &request.style_preset);
        prompt.push_str(&format!("\n(The base style '{label}' will be applied structurally by Freepik.)"));
        if let Some(notes) = request.custom_style_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            prompt.push_str(&format!("\nIncorporate these additional custom stylistic details: \"{notes}\"."));
        }
    } else {
        let style = request.resolved_style();
        prompt.push_str(&format!("\nIncorporate these stylistic details and elements: \"{style}\"."));
    }

    // negative prompt travels as a structural field
    prompt.push_str("\n\n");
    prompt.push_str(COMPOSITION_GUIDANCE);
    prompt
}

fn gemini_prompt(request: &GenerationRequest, has_reference: bool) -> String {
    let desc = &request.brand_description;
    let industry = industry_context(request);
    let style = request.resolved_style();

    let mut prompt = if has_reference {
        format!(
            "You are creating a strategic brand marketing image designed to drive engagement, build brand awareness, and convert viewers into customers on social media platforms.

**REFERENCE IMAGE:**
The provided example image is for inspiration only, not a copy source. Use it to understand the product category and the general visual territory, then create a completely new, brand-aligned visual asset.

**CORE CREATIVE BRIEF:**
1. **Brand Identity**: \"{desc}\"{industry}
   - Capture the brand's personality, values, and unique selling proposition
   - Consider the target audience's lifestyle, aspirations, and pain points
   - Show what makes this brand different from competitors

2. **Visual Execution Style**: \"{style}\"
   - This defines the aesthetic approach, mood, and technical execution
   - For realistic styles: create professional, market-ready visuals
   - For artistic styles: balance creativity with brand recognition

**MARKETING OPTIMIZATION REQUIREMENTS:**
- **Scroll-stopping power**: the image must stand out in social feeds
- **Brand consistency**: align with the brand's visual identity and messaging
- **Shareability**: create content people want to share

**CREATIVE GUIDELINES:**
- Do not reproduce the example image; do not copy its layout, subjects, or text
- Avoid generic or cliché visual approaches
- Include contextual elements that tell a brand story

**QUALITY STANDARDS:**
- Professional marketing-grade quality
- Culturally sensitive and inclusive
- Technically excellent (lighting, composition, clarity)"
        )
    } else {
        format!(
            "You are creating a strategic brand marketing image designed to maximize social media engagement and brand recognition.

**BRAND MARKETING OBJECTIVE:**
Create a compelling visual that represents: \"{desc}\"{industry}

**VISUAL EXECUTION STYLE**: \"{style}\"
- For realistic styles: create professional, market-ready content
- For artistic styles: balance creativity with brand clarity

**QUALITY STANDARDS:**
- Professional marketing-grade execution
- Culturally appropriate and inclusive
- Technically excellent (lighting, composition, clarity)"
        )
    };

    if let Some(neg) = request.negative_prompt.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(
            "\n\nAvoid the following elements or characteristics in the image: {neg}."
        ));
    }
    let aspect = &request.aspect_ratio;
    prompt.push_str(&format!(
        "\n\nThe final image should have an aspect ratio of {aspect}. Ensure the composition fits this ratio naturally, and the image content itself must fully occupy this {aspect} frame, without any artificial letterboxing or pillarboxing."
    ));
    if let Some(seed) = request.seed {
        prompt.push_str(&format!("\n\nUse seed: {seed}."));
    }
    prompt.push_str("\n\n");
    prompt.push_str(COMPOSITION_GUIDANCE);
    if request.number_of_images > 1 {
        prompt.push_str("\n\n");
        prompt.push_str(&batch_clause(1, request.number_of_images));
    }
    prompt
}

/// Variation instruction for image `index` of a batch of `total`.
pub fn batch_clause(index: u8, total: u8) -> String {
    format!(
        "Important for batch generation: You are generating image {index} of a set of {total}. All images in this set should feature the *same core subject or item* as described/derived from the inputs. For this specific image ({index}/{total}), try to vary the pose, angle, or minor background details slightly compared to other images in the set, while maintaining the identity of the primary subject."
    )
}

/// Rewrites the image-1 batch clause in `prompt` for `index`. Prompts whose
/// clause was edited away are returned as-is.
pub fn retarget_batch_clause(prompt: &str, index: u8, total: u8) -> String {
    if index <= 1 || total <= 1 {
        return prompt.to_string();
    }
    prompt.replace(&batch_clause(1, total), &batch_clause(index, total))
}

fn build_payload(
    request: &GenerationRequest,
    reference: Option<&str>,
    prompt: &str,
) -> GenerationPayload {
    let freepik = request.provider == Provider::Freepik;
    let effects = request.effects.as_ref().filter(|_| freepik);

    GenerationPayload {
        finalized_text_prompt: prompt.to_string(),
        provider: request.provider,
        brand_description: request.brand_description.clone(),
        industry: request.industry_value().unwrap_or_default().to_string(),
        image_style: request.resolved_style(),
        example_image: reference.map(str::to_string),
        aspect_ratio: request.aspect_ratio.clone(),
        number_of_images: request.number_of_images,
        negative_prompt: request
            .negative_prompt
            .clone()
            .filter(|n| !n.trim().is_empty()),
        seed: request.seed,
        freepik_dominant_colors_input: effects
            .filter(|e| !e.dominant_colors.is_empty())
            .map(|e| e.dominant_colors.join(",")),
        freepik_effect_color: effects.and_then(|e| e.color.clone()),
        freepik_effect_lightning: effects.and_then(|e| e.lightning.clone()),
        freepik_effect_framing: effects.and_then(|e| e.framing.clone()),
    }
}
