use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    composer::{ComposedPrompt, REFERENCE_DESCRIPTION_PLACEHOLDER},
    config::StudioConfig,
    error::ProviderError,
    freepik::FreepikClient,
    gemini::GeminiClient,
    models::{GenerationOutput, GenerationPayload, Provider, TaskStatus},
    normalizer::InlineImage,
};

/// The boundary every generation call goes through.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn generate_images(&self, payload: &GenerationPayload) -> Result<GenerationOutput, ProviderError>;

    /// Polls an asynchronous image task. Safe to repeat.
    async fn check_task(&self, task_id: &str) -> Result<TaskStatus, ProviderError>;

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Routes payloads to Gemini or Freepik.
pub struct ProviderBackend {
    gemini: GeminiClient,
    freepik: FreepikClient,
}

impl ProviderBackend {
    pub fn new(gemini: GeminiClient, freepik: FreepikClient) -> Self {
        Self { gemini, freepik }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(
            GeminiClient::new(config.gemini_api_key.clone(), config.gemini_base_url.clone()),
            FreepikClient::new(config.freepik_api_key.clone(), config.freepik_base_url.clone()),
        )
    }

    fn reference_image(payload: &GenerationPayload) -> Result<Option<InlineImage>, ProviderError> {
        match payload.example_image.as_deref() {
            Some(src) if src.starts_with("data:") => InlineImage::parse(src)
                .map(Some)
                .map_err(|e| ProviderError::Other(format!("example image: {e}"))),
            Some(_) => {
                warn!("example image is not inline data; generating without reference");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Swaps the reference placeholder for a description of the example image.
    async fn resolve_reference_placeholder(&self, prompt: &str, reference: Option<&InlineImage>) -> Result<String, ProviderError> {
        match reference {
            Some(image) if prompt.contains(REFERENCE_DESCRIPTION_PLACEHOLDER) => {
                let description = self.gemini.describe_image(image).await?;
                Ok(prompt.replace(
                    REFERENCE_DESCRIPTION_PLACEHOLDER,
                    &format!("Example image description: {description}"),
                ))
            }
            _ => Ok(prompt.to_string()),
        }
    }
}

#[async_trait]
impl ContentBackend for ProviderBackend {
    async fn generate_images(&self, payload: &GenerationPayload) -> Result<GenerationOutput, ProviderError> {
        let reference = Self::reference_image(payload)?;
        info!(
            provider = %payload.provider,
            images = payload.number_of_images,
            reference = reference.is_some(),
            "dispatching image generation"
        );
        let (markers, prompt_used) = match payload.provider {
            Provider::Gemini => {
                let prompt = ComposedPrompt::new(payload.finalized_text_prompt.clone(), payload.number_of_images);
                let markers = self.gemini.generate_images(&prompt, reference.as_ref()).await?;
                (markers, prompt.into_text())
            }
            Provider::Freepik => {
                let prompt = self
                    .resolve_reference_placeholder(&payload.finalized_text_prompt, reference.as_ref())
                    .await?;
                let markers = self.freepik.submit(payload, &prompt).await?;
                (markers, prompt)
            }
        };
        Ok(GenerationOutput {
            generated_images: markers,
            prompt_used,
            provider_used: payload.provider,
        })
    }

    async fn check_task(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        self.freepik.task_status(task_id).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.gemini.generate_text(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEMO_KEY, models::ResultMarker};
    use pretty_assertions::assert_eq;

    fn demo_backend() -> ProviderBackend {
        ProviderBackend::new(
            GeminiClient::new(DEMO_KEY.into(), "http://localhost".into()),
            FreepikClient::new(None, "http://localhost".into()),
        )
    }

    fn payload(provider: Provider) -> GenerationPayload {
        GenerationPayload {
            finalized_text_prompt: format!("{REFERENCE_DESCRIPTION_PLACEHOLDER}\nthen the concept"),
            provider,
            brand_description: "b".into(),
            industry: String::new(),
            image_style: "Minimalist".into(),
            example_image: None,
            aspect_ratio: "1:1".into(),
            number_of_images: 2,
            negative_prompt: None,
            seed: None,
            freepik_dominant_colors_input: None,
            freepik_effect_color: None,
            freepik_effect_lightning: None,
            freepik_effect_framing: None,
        }
    }

    #[tokio::test]
    async fn gemini_demo_generates_every_image() {
        let output = demo_backend().generate_images(&payload(Provider::Gemini)).await.unwrap();
        assert_eq!(output.generated_images.len(), 2);
        assert_eq!(output.provider_used, Provider::Gemini);
        assert!(matches!(output.generated_images[0], ResultMarker::Inline(_)));
    }

    #[tokio::test]
    async fn placeholder_is_replaced_with_description() {
        let backend = demo_backend();
        let image = InlineImage::parse("data:image/png;base64,AAAA").unwrap();
        let prompt = backend
            .resolve_reference_placeholder(&payload(Provider::Freepik).finalized_text_prompt, Some(&image))
            .await
            .unwrap();
        assert!(!prompt.contains(REFERENCE_DESCRIPTION_PLACEHOLDER));
        assert!(prompt.starts_with("Example image description: "));
    }

    #[tokio::test]
    async fn freepik_without_key_fails_before_network() {
        let err = demo_backend().generate_images(&payload(Provider::Freepik)).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn bad_example_image_is_rejected() {
        let mut p = payload(Provider::Gemini);
        p.example_image = Some("data:image/png,raw".into());
        assert!(ProviderBackend::reference_image(&p).is_err());
        p.example_image = Some("https://cdn.example/ref.png".into());
        assert_eq!(ProviderBackend::reference_image(&p).unwrap(), None);
    }
}
