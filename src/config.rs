use crate::normalizer::MAX_INLINE_IMAGE_BYTES;

pub const DEMO_KEY: &str = "DEMO_KEY";
const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_FREEPIK_BASE: &str = "https://api.freepik.com";
const DEFAULT_ADMIN_EMAIL: &str = "admin@brandforge.ai";

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub freepik_api_key: Option<String>,
    pub freepik_base_url: String,
    pub admin_email: String,
    pub port: u16,
    pub max_inline_image_bytes: usize,
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or_else(|| DEMO_KEY.into()),
            gemini_base_url: non_empty("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_BASE.into()),
            freepik_api_key: non_empty("FREEPIK_API_KEY"),
            freepik_base_url: non_empty("FREEPIK_API_BASE").unwrap_or_else(|| DEFAULT_FREEPIK_BASE.into()),
            admin_email: non_empty("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.into()),
            port: non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            max_inline_image_bytes: non_empty("MAX_INLINE_IMAGE_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_INLINE_IMAGE_BYTES),
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.gemini_api_key == DEMO_KEY
    }

    pub fn is_admin(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.admin_email)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_fall_back_to_demo_mode() {
        let cfg = StudioConfig::default();
        assert!(cfg.demo_mode());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.freepik_api_key, None);
        assert_eq!(cfg.max_inline_image_bytes, 1000 * 1024);
    }

    #[test]
    fn lookup_overrides_and_ignores_blank_values() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "real-key"),
            ("FREEPIK_API_KEY", "  "),
            ("PORT", "9000"),
            ("ADMIN_EMAIL", "Boss@Example.com"),
        ]
        .into_iter()
        .collect();
        let cfg = StudioConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(!cfg.demo_mode());
        assert_eq!(cfg.freepik_api_key, None);
        assert_eq!(cfg.port, 9000);
        assert!(cfg.is_admin("boss@example.com"));
        assert!(!cfg.is_admin("someone@example.com"));
    }
}
