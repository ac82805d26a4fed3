//! Prompt builders and response parsers for the text generators: social
//! captions, blog outlines and blog posts.

use serde::Deserialize;

use crate::{
    catalog,
    models::{BlogOutlineRequest, BlogPlatform, BlogPostRequest, BrandProfile, SocialPostRequest},
};

fn industry_label(industry: Option<&str>) -> Option<&str> {
    industry
        .map(str::trim)
        .filter(|i| !i.is_empty() && *i != catalog::NO_INDUSTRY)
        .map(|i| catalog::label_or_value(catalog::INDUSTRIES, i))
}

fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates
        .iter()
        .copied()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Tone plus any custom nuances, as recorded on the post.
pub fn social_tone(request: &SocialPostRequest) -> String {
    match request.custom_tone_nuances.trim() {
        "" => request.tone.clone(),
        nuances => format!("{} {}", request.tone, nuances),
    }
}

pub fn social_caption_prompt(request: &SocialPostRequest, brand: &BrandProfile, has_image: bool) -> String {
    let description = first_non_empty(&[request.brand_description.as_deref(), Some(brand.brand_description.as_str())]);
    let mut prompt = format!(
        "You are a social media copywriter. Write an Instagram caption for this brand: \"{description}\"."
    );
    if let Some(label) = industry_label(request.industry.as_deref().or(Some(brand.industry.as_str()))) {
        prompt.push_str(&format!(" The brand operates in the {label} industry."));
    }
    prompt.push_str(&format!(" Write in a {} tone.", social_tone(request)));
    if has_image && !request.image_description.trim().is_empty() {
        prompt.push_str(&format!(
            " The post includes an image showing: {}. Refer to it naturally.",
            request.image_description.trim()
        ));
    }
    prompt.push_str(
        " Keep the caption under 150 words, end with a clear call to action, and suggest 5 to 10 relevant hashtags. \
Respond only with JSON of the form {\"caption\": \"...\", \"hashtags\": \"#one #two\"}.",
    );
    prompt
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Caption {
    pub caption: String,
    #[serde(default)]
    pub hashtags: String,
}

/// Lenient parse: JSON (optionally fenced), else the raw text as caption.
pub fn parse_caption(text: &str) -> Caption {
    serde_json::from_str(strip_fences(text)).unwrap_or_else(|_| Caption {
        caption: text.trim().to_string(),
        hashtags: String::new(),
    })
}

pub fn blog_outline_prompt(request: &BlogOutlineRequest, brand: &BrandProfile) -> Option<String> {
    let name = first_non_empty(&[request.brand_name.as_deref(), Some(brand.brand_name.as_str())]);
    let description = first_non_empty(&[request.brand_description.as_deref(), Some(brand.brand_description.as_str())]);
    let keywords = first_non_empty(&[request.keywords.as_deref(), Some(brand.target_keywords.as_str())]);
    if name.is_empty() && description.is_empty() && keywords.is_empty() {
        return None;
    }
    let website = first_non_empty(&[request.website_url.as_deref(), Some(brand.website_url.as_str())]);

    let mut prompt = format!(
        "Create a detailed blog post outline for the brand \"{name}\". Brand description: {description}."
    );
    if let Some(label) = industry_label(request.industry.as_deref().or(Some(brand.industry.as_str()))) {
        prompt.push_str(&format!(" Industry: {label}."));
    }
    if !keywords.is_empty() {
        prompt.push_str(&format!(" Target keywords: {keywords}."));
    }
    if !website.is_empty() {
        prompt.push_str(&format!(" Website: {website}."));
    }
    prompt.push_str(
        " Return a numbered outline with an introduction, 3 to 5 main sections with short bullet points, and a conclusion. Plain text only.",
    );
    Some(prompt)
}

pub fn blog_post_prompt(request: &BlogPostRequest, brand: &BrandProfile) -> String {
    let name = first_non_empty(&[request.brief.brand_name.as_deref(), Some(brand.brand_name.as_str())]);
    let description = first_non_empty(&[request.brief.brand_description.as_deref(), Some(brand.brand_description.as_str())]);
    let keywords = first_non_empty(&[request.brief.keywords.as_deref(), Some(brand.target_keywords.as_str())]);
    let platform = match request.platform {
        BlogPlatform::Medium => "Medium (use Markdown headings and short paragraphs)",
        BlogPlatform::Other => "a company blog",
    };
    let mut prompt = format!(
        "Write a complete blog post for {platform} on behalf of the brand \"{name}\" ({description})."
    );
    if let Some(label) = industry_label(request.brief.industry.as_deref().or(Some(brand.industry.as_str()))) {
        prompt.push_str(&format!(" Industry: {label}."));
    }
    if !keywords.is_empty() {
        prompt.push_str(&format!(" Weave in these keywords naturally: {keywords}."));
    }
    prompt.push_str(&format!(" Tone: {}.", request.tone));
    prompt.push_str(&format!("\n\nFollow this outline:\n{}\n\n", request.outline.trim()));
    prompt.push_str(
        "Respond only with JSON of the form {\"title\": \"...\", \"content\": \"...\", \"tags\": \"tag1, tag2\"}.",
    );
    prompt
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: String,
}

/// Parses the model's blog JSON; a bare text reply becomes untitled content.
pub fn parse_blog_post(text: &str) -> BlogDraft {
    serde_json::from_str(strip_fences(text)).unwrap_or_else(|_| BlogDraft {
        title: "Untitled".to_string(),
        content: text.trim().to_string(),
        tags: String::new(),
    })
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn brand() -> BrandProfile {
        BrandProfile {
            brand_name: "Verdant".into(),
            brand_description: "Eco-friendly skincare".into(),
            industry: "beauty_cosmetics".into(),
            target_keywords: "vegan, refillable".into(),
            ..Default::default()
        }
    }

    fn social() -> SocialPostRequest {
        SocialPostRequest {
            image: None,
            image_description: "a jar on moss".into(),
            tone: "playful".into(),
            custom_tone_nuances: "with puns".into(),
            brand_description: None,
            industry: None,
        }
    }

    #[test]
    fn caption_prompt_falls_back_to_brand() {
        let prompt = social_caption_prompt(&social(), &brand(), true);
        assert!(prompt.contains("\"Eco-friendly skincare\""));
        assert!(prompt.contains("Beauty & Cosmetics"));
        assert!(prompt.contains("playful with puns tone"));
        assert!(prompt.contains("a jar on moss"));

        let without_image = social_caption_prompt(&social(), &brand(), false);
        assert!(!without_image.contains("a jar on moss"));
    }

    #[test]
    fn captions_parse_from_fenced_json_or_plain_text() {
        let fenced = "```json\n{\"caption\": \"Glow on\", \"hashtags\": \"#glow\"}\n```";
        assert_eq!(
            parse_caption(fenced),
            Caption { caption: "Glow on".into(), hashtags: "#glow".into() }
        );
        assert_eq!(parse_caption(" just words ").caption, "just words");
    }

    #[test]
    fn outline_needs_some_brand_input() {
        let empty = BrandProfile::default();
        assert_eq!(blog_outline_prompt(&BlogOutlineRequest::default(), &empty), None);

        let prompt = blog_outline_prompt(&BlogOutlineRequest::default(), &brand()).unwrap();
        assert!(prompt.contains("\"Verdant\""));
        assert!(prompt.contains("Target keywords: vegan, refillable."));
    }

    #[test]
    fn blog_post_prompt_includes_outline_and_platform() {
        let request = BlogPostRequest {
            brief: BlogOutlineRequest::default(),
            outline: "1. Intro\n2. Refills".into(),
            tone: "Witty and engaging".into(),
            platform: BlogPlatform::Medium,
        };
        let prompt = blog_post_prompt(&request, &brand());
        assert!(prompt.contains("Medium"));
        assert!(prompt.contains("1. Intro\n2. Refills"));
        assert!(prompt.contains("Tone: Witty and engaging."));
    }

    #[test]
    fn blog_draft_falls_back_to_untitled() {
        let draft = parse_blog_post("{\"title\":\"T\",\"content\":\"C\",\"tags\":\"a, b\"}");
        assert_eq!(draft.title, "T");
        assert_eq!(parse_blog_post("raw body").title, "Untitled");
    }
}
