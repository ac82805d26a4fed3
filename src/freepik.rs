use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    composer,
    error::ProviderError,
    models::{GenerationPayload, ResultMarker, TaskState, TaskStatus},
};

const IMAGEN3_PATH: &str = "/v1/ai/text-to-image/imagen3";
/// Weight given to every user-picked dominant colour.
const COLOR_WEIGHT: f32 = 0.5;

/// Freepik's Imagen3 endpoint. Generation is asynchronous: a submission
/// yields a task id which is polled until it completes.
pub struct FreepikClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Imagen3Request {
    prompt: String,
    num_images: u8,
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Styling::is_empty")]
    styling: Styling,
}

#[derive(Debug, Serialize, Default, PartialEq)]
struct Styling {
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<String>,
    #[serde(skip_serializing_if = "Effects::is_empty")]
    effects: Effects,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    colors: Vec<WeightedColor>,
}

impl Styling {
    fn is_empty(&self) -> bool {
        self.style.is_none() && self.effects.is_empty() && self.colors.is_empty()
    }
}

#[derive(Debug, Serialize, Default, PartialEq)]
struct Effects {
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lightning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    framing: Option<String>,
}

impl Effects {
    fn is_empty(&self) -> bool {
        self.color.is_none() && self.lightning.is_none() && self.framing.is_none()
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct WeightedColor {
    color: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    data: TaskData,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    task_id: String,
    status: TaskState,
    #[serde(default)]
    generated: Vec<String>,
}

impl FreepikClient {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured("Freepik API"))
    }

    fn build_request(payload: &GenerationPayload, prompt: &str) -> Imagen3Request {
        Imagen3Request {
            prompt: prompt.to_string(),
            num_images: payload.number_of_images,
            aspect_ratio: payload.aspect_ratio.clone(),
            negative_prompt: payload.negative_prompt.clone(),
            styling: Styling {
                style: composer::freepik_structural_style(&payload.image_style).map(str::to_string),
                effects: Effects {
                    color: payload.freepik_effect_color.clone(),
                    lightning: payload.freepik_effect_lightning.clone(),
                    framing: payload.freepik_effect_framing.clone(),
                },
                colors: payload
                    .dominant_colors()
                    .into_iter()
                    .map(|c| WeightedColor { color: c.to_string(), weight: COLOR_WEIGHT })
                    .collect(),
            },
        }
    }

    /// Starts a generation task and returns its pending marker.
    pub async fn submit(&self, payload: &GenerationPayload, prompt: &str) -> Result<Vec<ResultMarker>, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, IMAGEN3_PATH);
        let body = Self::build_request(payload, prompt);
        info!("🔗 Submitting Freepik Imagen3 task ({} image(s), {})", body.num_images, body.aspect_ratio);

        let response = self.client
            .post(&url)
            .header("x-freepik-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let task = Self::read_task(response).await?;
        info!("📥 Freepik task {} created with status {}", task.task_id, task.status);

        // some tasks complete synchronously
        if task.status == TaskState::Completed && !task.generated.is_empty() {
            return Ok(task.generated.into_iter().map(ResultMarker::Hosted).collect());
        }
        Ok(vec![ResultMarker::Pending(task.task_id)])
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}/{}", self.base_url, IMAGEN3_PATH, task_id);
        info!("🔗 Checking Freepik task {}", task_id);

        let response = self.client
            .get(&url)
            .header("x-freepik-api-key", api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let task = Self::read_task(response).await?;
        info!("📥 Freepik task {} is {}", task.task_id, task.status);
        Ok(TaskStatus { task_id: task.task_id, status: task.status, images: task.generated })
    }

    async fn read_task(response: reqwest::Response) -> Result<TaskData, ProviderError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| ProviderError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ Freepik API error {}: {}", status, text);
            return Err(ProviderError::Api { status: status.as_u16(), body: text });
        }
        serde_json::from_str::<TaskEnvelope>(&text)
            .map(|env| env.data)
            .map_err(|e| ProviderError::Parse(format!("{}: {}", e, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload() -> GenerationPayload {
        GenerationPayload {
            finalized_text_prompt: "p".into(),
            provider: Provider::Freepik,
            brand_description: "Eco-friendly skincare".into(),
            industry: String::new(),
            image_style: "watercolor, soft washes. dewy".into(),
            example_image: None,
            aspect_ratio: "square_1_1".into(),
            number_of_images: 2,
            negative_prompt: None,
            seed: Some(9),
            freepik_dominant_colors_input: Some("#112233, #445566".into()),
            freepik_effect_color: Some("pastel".into()),
            freepik_effect_lightning: None,
            freepik_effect_framing: None,
        }
    }

    #[test]
    fn request_carries_structural_fields() {
        let body = serde_json::to_value(FreepikClient::build_request(&payload(), "final prompt")).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": "final prompt",
                "num_images": 2,
                "aspect_ratio": "square_1_1",
                "styling": {
                    "style": "watercolor",
                    "effects": { "color": "pastel" },
                    "colors": [
                        { "color": "#112233", "weight": 0.5 },
                        { "color": "#445566", "weight": 0.5 }
                    ]
                }
            })
        );
    }

    #[test]
    fn free_text_style_sends_no_styling() {
        let mut p = payload();
        p.image_style = "Minimalist".into();
        p.freepik_dominant_colors_input = None;
        p.freepik_effect_color = None;
        let body = serde_json::to_value(FreepikClient::build_request(&p, "x")).unwrap();
        assert!(body.get("styling").is_none());
    }

    #[test]
    fn task_envelope_parses() {
        let env: TaskEnvelope = serde_json::from_value(json!({
            "data": { "task_id": "abc", "status": "COMPLETED", "generated": ["https://x/1.png"] }
        }))
        .unwrap();
        assert_eq!(env.data.status, TaskState::Completed);
        assert_eq!(env.data.generated, vec!["https://x/1.png"]);
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let client = FreepikClient::new(None, "http://localhost".into());
        let err = client.task_status("abc").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
