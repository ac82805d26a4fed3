use serde::Serialize;

use crate::models::Provider;

/// A selectable value with a human label.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CatalogOption {
    pub value: &'static str,
    pub label: &'static str,
}

const fn opt(value: &'static str, label: &'static str) -> CatalogOption {
    CatalogOption { value, label }
}

pub const NO_INDUSTRY: &str = "_none_";
pub const NO_INDUSTRY_LABEL: &str = "None / Not Applicable";
pub const NO_EFFECT: &str = "none";

pub const INDUSTRIES: &[CatalogOption] = &[
    opt(NO_INDUSTRY, NO_INDUSTRY_LABEL),
    opt("fashion_apparel", "Fashion & Apparel"),
    opt("beauty_cosmetics", "Beauty & Cosmetics"),
    opt("food_beverage", "Food & Beverage"),
    opt("health_wellness", "Health & Wellness"),
    opt("technology", "Technology & SaaS"),
    opt("travel_hospitality", "Travel & Hospitality"),
    opt("home_decor", "Home & Decor"),
    opt("fitness_sports", "Fitness & Sports"),
    opt("education", "Education & E-learning"),
    opt("finance", "Finance & Fintech"),
    opt("real_estate", "Real Estate"),
    opt("automotive", "Automotive"),
    opt("entertainment", "Entertainment & Media"),
    opt("non_profit", "Non-Profit"),
    opt("other", "Other"),
];

pub const IMAGE_STYLE_PRESETS: &[CatalogOption] = &[
    opt("photo, professional product photography", "Photographic"),
    opt("Minimalist", "Minimalist"),
    opt("digital-art, vibrant and detailed", "Digital Art"),
    opt("3d, rendered with soft studio lighting", "3D Render"),
    opt("watercolor, soft washes and textured paper", "Watercolor"),
    opt("cinematic - dramatic film still", "Cinematic"),
    opt("vintage, retro film grain", "Vintage"),
    opt("anime", "Anime"),
    opt("Flat illustration with bold shapes", "Flat Illustration"),
    opt("Lifestyle candid shot", "Lifestyle"),
    opt("Luxury editorial with rich textures", "Luxury Editorial"),
];

/// Styles Freepik's Imagen3 endpoint accepts as a structural `styling.style`.
pub const FREEPIK_VALID_STYLES: &[&str] = &[
    "photo",
    "digital-art",
    "3d",
    "painting",
    "low-poly",
    "pixel-art",
    "anime",
    "cyberpunk",
    "comic",
    "vintage",
    "cartoon",
    "vector",
    "studio-shot",
    "dark",
    "sketch",
    "mockup",
    "2000s-pone",
    "70s-vibe",
    "watercolor",
    "art-nouveau",
    "origami",
    "surreal",
    "fantasy",
    "traditional-japan",
];

pub const FREEPIK_EFFECT_COLORS: &[CatalogOption] = &[
    opt(NO_EFFECT, "None"),
    opt("b&w", "Black & White"),
    opt("pastel", "Pastel"),
    opt("sepia", "Sepia"),
    opt("dramatic", "Dramatic"),
    opt("vibrant", "Vibrant"),
    opt("orange&teal", "Orange & Teal"),
    opt("film-filter", "Film Filter"),
    opt("split", "Split"),
    opt("electric", "Electric"),
    opt("pastel-pink", "Pastel Pink"),
    opt("gold-glow", "Gold Glow"),
    opt("autumn", "Autumn"),
    opt("muted-green", "Muted Green"),
    opt("deep-teal", "Deep Teal"),
    opt("duotone", "Duotone"),
    opt("terracotta&teal", "Terracotta & Teal"),
    opt("red&blue", "Red & Blue"),
    opt("cold-neon", "Cold Neon"),
    opt("burgundy&blue", "Burgundy & Blue"),
];

pub const FREEPIK_EFFECT_LIGHTNINGS: &[CatalogOption] = &[
    opt(NO_EFFECT, "None"),
    opt("studio", "Studio"),
    opt("warm", "Warm"),
    opt("cinematic", "Cinematic"),
    opt("volumetric", "Volumetric"),
    opt("golden-hour", "Golden Hour"),
    opt("long-exposure", "Long Exposure"),
    opt("cold", "Cold"),
    opt("iridescent", "Iridescent"),
    opt("dramatic", "Dramatic"),
    opt("hardlight", "Hard Light"),
    opt("redscale", "Redscale"),
    opt("indoor-light", "Indoor Light"),
];

pub const FREEPIK_EFFECT_FRAMINGS: &[CatalogOption] = &[
    opt(NO_EFFECT, "None"),
    opt("portrait", "Portrait"),
    opt("macro", "Macro"),
    opt("panoramic", "Panoramic"),
    opt("aerial-view", "Aerial View"),
    opt("close-up", "Close-up"),
    opt("cinematic", "Cinematic"),
    opt("high-angle", "High Angle"),
    opt("low-angle", "Low Angle"),
    opt("symmetry", "Symmetry"),
    opt("fish-eye", "Fish-eye"),
    opt("first-person", "First Person"),
];

pub const GENERAL_ASPECT_RATIOS: &[CatalogOption] = &[
    opt("1:1", "Square (1:1)"),
    opt("16:9", "Widescreen (16:9)"),
    opt("9:16", "Story (9:16)"),
    opt("4:3", "Landscape (4:3)"),
    opt("3:4", "Portrait (3:4)"),
];

pub const FREEPIK_ASPECT_RATIOS: &[CatalogOption] = &[
    opt("square_1_1", "Square (1:1)"),
    opt("social_story_9_16", "Social Story (9:16)"),
    opt("widescreen_16_9", "Widescreen (16:9)"),
    opt("traditional_3_4", "Traditional (3:4)"),
    opt("classic_4_3", "Classic (4:3)"),
];

pub const BLOG_TONES: &[CatalogOption] = &[
    opt("Informative and helpful", "Informative"),
    opt("Friendly and conversational", "Conversational"),
    opt("Professional and authoritative", "Professional"),
    opt("Witty and engaging", "Witty"),
    opt("Inspirational and uplifting", "Inspirational"),
];

/// Aspect ratios the provider accepts; the first entry is its default.
pub fn aspect_ratios_for(provider: Provider) -> &'static [CatalogOption] {
    match provider {
        Provider::Gemini => GENERAL_ASPECT_RATIOS,
        Provider::Freepik => FREEPIK_ASPECT_RATIOS,
    }
}

pub fn default_aspect_ratio(provider: Provider) -> &'static str {
    aspect_ratios_for(provider)[0].value
}

pub fn is_valid_aspect_ratio(provider: Provider, ratio: &str) -> bool {
    aspect_ratios_for(provider).iter().any(|o| o.value == ratio)
}

pub fn contains(options: &[CatalogOption], value: &str) -> bool {
    options.iter().any(|o| o.value == value)
}

/// Catalog label for `value`, or the value itself when it is not listed.
pub fn label_or_value<'a>(options: &'static [CatalogOption], value: &'a str) -> &'a str {
    options
        .iter()
        .find(|o| o.value == value)
        .map_or(value, |o| o.label)
}

/// The whole vocabulary, as served to the UI.
#[derive(Debug, Serialize)]
pub struct Catalog {
    pub industries: &'static [CatalogOption],
    pub image_style_presets: &'static [CatalogOption],
    pub freepik_valid_styles: &'static [&'static str],
    pub freepik_effect_colors: &'static [CatalogOption],
    pub freepik_effect_lightnings: &'static [CatalogOption],
    pub freepik_effect_framings: &'static [CatalogOption],
    pub general_aspect_ratios: &'static [CatalogOption],
    pub freepik_aspect_ratios: &'static [CatalogOption],
    pub blog_tones: &'static [CatalogOption],
}

pub fn catalog() -> Catalog {
    Catalog {
        industries: INDUSTRIES,
        image_style_presets: IMAGE_STYLE_PRESETS,
        freepik_valid_styles: FREEPIK_VALID_STYLES,
        freepik_effect_colors: FREEPIK_EFFECT_COLORS,
        freepik_effect_lightnings: FREEPIK_EFFECT_LIGHTNINGS,
        freepik_effect_framings: FREEPIK_EFFECT_FRAMINGS,
        general_aspect_ratios: GENERAL_ASPECT_RATIOS,
        freepik_aspect_ratios: FREEPIK_ASPECT_RATIOS,
        blog_tones: BLOG_TONES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn provider_aspect_sets_do_not_overlap() {
        for ratio in GENERAL_ASPECT_RATIOS {
            assert!(!is_valid_aspect_ratio(Provider::Freepik, ratio.value));
        }
        assert_eq!(default_aspect_ratio(Provider::Freepik), "square_1_1");
        assert_eq!(default_aspect_ratio(Provider::Gemini), "1:1");
    }

    #[test]
    fn unknown_values_fall_back_to_themselves() {
        assert_eq!(label_or_value(INDUSTRIES, "technology"), "Technology & SaaS");
        assert_eq!(label_or_value(INDUSTRIES, "Artisanal Cheese"), "Artisanal Cheese");
    }
}
