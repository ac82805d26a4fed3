//! Per-user studio state: the image form, the preview/submit phases and the
//! ordered collections of results and generated assets.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    catalog,
    composer::{self, ComposeError, ComposedPrompt},
    models::{
        BlogOutline, BlogPost, BrandProfile, FreepikEffects, GeneratedAsset, GenerationOutput,
        GenerationPayload, GenerationRequest, Provider, ResultMarker, SocialImageChoice,
        SocialPost, TaskState, TaskStatus,
    },
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} is only available to administrators")]
    AdminOnly(&'static str),
    #[error("provider {0} is not available for this account")]
    ProviderNotAllowed(Provider),
    #[error("an image generation is already in progress")]
    AlreadySubmitting,
    #[error("no image generation is in progress")]
    NotSubmitting,
    #[error("there is no prompt preview to edit")]
    NoPreview,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    EditingFields,
    PreviewingPrompt,
    Submitting,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Destructive,
}

/// User-facing notification produced by a transition.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), severity: Severity::Info }
    }

    fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), severity: Severity::Destructive }
    }
}

/// Current values of the image generation form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageForm {
    pub provider: Provider,
    pub brand_description: String,
    pub industry: String,
    pub style_preset: String,
    pub custom_style_notes: String,
    pub negative_prompt: String,
    pub aspect_ratio: String,
    pub number_of_images: u8,
    pub seed: Option<i64>,
    pub freepik_dominant_colors: String,
    pub freepik_effect_color: String,
    pub freepik_effect_lightning: String,
    pub freepik_effect_framing: String,
    pub use_example_image: bool,
    pub example_image_index: Option<usize>,
}

impl ImageForm {
    fn seeded_from(brand: &BrandProfile) -> Self {
        let industry = if brand.industry.trim().is_empty() {
            catalog::NO_INDUSTRY.to_string()
        } else {
            brand.industry.clone()
        };
        Self {
            provider: Provider::Gemini,
            brand_description: brand.brand_description.clone(),
            industry,
            style_preset: catalog::IMAGE_STYLE_PRESETS[0].value.to_string(),
            custom_style_notes: brand.image_style_notes.clone(),
            negative_prompt: String::new(),
            aspect_ratio: catalog::default_aspect_ratio(Provider::Gemini).to_string(),
            number_of_images: 1,
            seed: None,
            freepik_dominant_colors: String::new(),
            freepik_effect_color: catalog::NO_EFFECT.to_string(),
            freepik_effect_lightning: catalog::NO_EFFECT.to_string(),
            freepik_effect_framing: catalog::NO_EFFECT.to_string(),
            use_example_image: true,
            example_image_index: (!brand.example_images.is_empty()).then_some(0),
        }
    }

    /// Explicit snapshot of the form for composition.
    pub fn snapshot(&self) -> GenerationRequest {
        let opt = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        let effects = match self.provider {
            Provider::Freepik => FreepikEffects::from_inputs(
                &self.freepik_dominant_colors,
                &self.freepik_effect_color,
                &self.freepik_effect_lightning,
                &self.freepik_effect_framing,
            ),
            Provider::Gemini => None,
        };
        GenerationRequest {
            brand_description: self.brand_description.clone(),
            industry: opt(&self.industry),
            style_preset: self.style_preset.clone(),
            custom_style_notes: opt(&self.custom_style_notes),
            negative_prompt: opt(&self.negative_prompt),
            aspect_ratio: self.aspect_ratio.clone(),
            number_of_images: self.number_of_images,
            seed: self.seed,
            provider: self.provider,
            effects,
            use_example_image: self.use_example_image,
        }
    }
}

/// Partial form update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFormPatch {
    pub provider: Option<Provider>,
    pub brand_description: Option<String>,
    pub industry: Option<String>,
    pub style_preset: Option<String>,
    pub custom_style_notes: Option<String>,
    pub negative_prompt: Option<String>,
    pub aspect_ratio: Option<String>,
    pub number_of_images: Option<u8>,
    /// `Some(None)` clears the seed.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub seed: Option<Option<i64>>,
    pub freepik_dominant_colors: Option<String>,
    pub freepik_effect_color: Option<String>,
    pub freepik_effect_lightning: Option<String>,
    pub freepik_effect_framing: Option<String>,
    pub use_example_image: Option<bool>,
    pub example_image_index: Option<usize>,
}

/// An admin's reviewed prompt together with the snapshot it was built from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptPreview {
    pub text: String,
    pub request: GenerationRequest,
    #[serde(skip)]
    example_image: Option<String>,
}

/// What the caller must hand to the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub prompt: ComposedPrompt,
    pub payload: GenerationPayload,
}

#[derive(Debug, Clone)]
struct InFlight {
    style: String,
    provider: Provider,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioSession {
    pub id: Uuid,
    pub role: UserRole,
    pub brand: BrandProfile,
    pub form: ImageForm,
    pub phase: Phase,
    pub preview: Option<PromptPreview>,
    /// Markers from the most recent generation, in display order.
    pub results: Vec<ResultMarker>,
    pub last_prompt: Option<String>,
    pub last_provider: Option<Provider>,
    pub assets: Vec<GeneratedAsset>,
    pub social_posts: Vec<SocialPost>,
    pub blog_outline: Option<BlogOutline>,
    pub blog_posts: Vec<BlogPost>,
    #[serde(skip)]
    in_flight: Option<InFlight>,
}

impl StudioSession {
    pub fn new(role: UserRole, brand: BrandProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            form: ImageForm::seeded_from(&brand),
            brand,
            phase: Phase::EditingFields,
            preview: None,
            results: Vec::new(),
            last_prompt: None,
            last_provider: None,
            assets: Vec::new(),
            social_posts: Vec::new(),
            blog_outline: None,
            blog_posts: Vec::new(),
            in_flight: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Switches provider, resetting an aspect ratio the new provider lacks.
    pub fn set_provider(&mut self, provider: Provider) -> Result<(), SessionError> {
        if !self.is_admin() && provider != Provider::Gemini {
            return Err(SessionError::ProviderNotAllowed(provider));
        }
        self.form.provider = provider;
        if !catalog::is_valid_aspect_ratio(provider, &self.form.aspect_ratio) {
            let default = catalog::default_aspect_ratio(provider);
            debug!(from = %self.form.aspect_ratio, to = default, "aspect ratio reset for provider");
            self.form.aspect_ratio = default.to_string();
        }
        Ok(())
    }

    /// Applies the whole patch or none of it.
    pub fn update_form(&mut self, patch: ImageFormPatch) -> Result<(), SessionError> {
        let saved = self.form.clone();
        let applied = self.apply_patch(patch);
        if applied.is_err() {
            self.form = saved;
        }
        applied
    }

    fn apply_patch(&mut self, patch: ImageFormPatch) -> Result<(), SessionError> {
        // provider first so a ratio in the same patch is checked against it
        if let Some(provider) = patch.provider {
            self.set_provider(provider)?;
        }
        if let Some(ratio) = patch.aspect_ratio {
            if !catalog::is_valid_aspect_ratio(self.form.provider, &ratio) {
                return Err(SessionError::Invalid(format!(
                    "aspect ratio '{ratio}' is not offered by {}",
                    self.form.provider
                )));
            }
            self.form.aspect_ratio = ratio;
        }
        if let Some(n) = patch.number_of_images {
            if !(1..=composer::MAX_IMAGES_PER_BATCH).contains(&n) {
                return Err(SessionError::Invalid(format!("number of images must be 1-4, got {n}")));
            }
            self.form.number_of_images = n;
        }
        if let Some(index) = patch.example_image_index {
            if index >= self.brand.example_images.len() {
                return Err(SessionError::Invalid(format!("no example image at index {index}")));
            }
            self.form.example_image_index = Some(index);
        }

        let form = &mut self.form;
        let text_fields = [
            (patch.brand_description, &mut form.brand_description),
            (patch.industry, &mut form.industry),
            (patch.style_preset, &mut form.style_preset),
            (patch.custom_style_notes, &mut form.custom_style_notes),
            (patch.negative_prompt, &mut form.negative_prompt),
            (patch.freepik_dominant_colors, &mut form.freepik_dominant_colors),
            (patch.freepik_effect_color, &mut form.freepik_effect_color),
            (patch.freepik_effect_lightning, &mut form.freepik_effect_lightning),
            (patch.freepik_effect_framing, &mut form.freepik_effect_framing),
        ];
        for (value, slot) in text_fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(seed) = patch.seed {
            form.seed = seed;
        }
        if let Some(use_example) = patch.use_example_image {
            form.use_example_image = use_example;
        }
        Ok(())
    }

    /// Example image the form currently points at, if it opted in.
    pub fn example_image(&self) -> Option<&str> {
        if !self.form.use_example_image {
            return None;
        }
        self.form
            .example_image_index
            .and_then(|i| self.brand.example_images.get(i))
            .map(String::as_str)
            .filter(|img| !img.trim().is_empty())
    }

    /// Composes the prompt for review. Admins only.
    pub fn preview_prompt(&mut self) -> Result<&PromptPreview, SessionError> {
        if !self.is_admin() {
            return Err(SessionError::AdminOnly("prompt preview"));
        }
        if self.phase == Phase::Submitting {
            return Err(SessionError::AlreadySubmitting);
        }
        let request = self.form.snapshot();
        let example_image = self.example_image().map(str::to_string);
        let composed = composer::compose(&request, example_image.as_deref())?;
        info!(session = %self.id, provider = %request.provider, "prompt preview ready");
        self.phase = Phase::PreviewingPrompt;
        Ok(self.preview.insert(PromptPreview {
            text: composed.prompt.into_text(),
            request,
            example_image,
        }))
    }

    pub fn edit_preview(&mut self, text: String) -> Result<(), SessionError> {
        match (&mut self.preview, self.phase) {
            (Some(preview), Phase::PreviewingPrompt) => {
                preview.text = text;
                Ok(())
            }
            _ => Err(SessionError::NoPreview),
        }
    }

    /// Validates and freezes the submission; the session is `Submitting`
    /// until [`StudioSession::complete_submission`] is called.
    pub fn begin_submission(&mut self) -> Result<Dispatch, SessionError> {
        if self.phase == Phase::Submitting {
            return Err(SessionError::AlreadySubmitting);
        }

        let dispatch = match self.preview.as_ref().filter(|_| self.is_admin()) {
            Some(preview) => {
                let composed = composer::compose(&preview.request, preview.example_image.as_deref())?;
                let mut payload = composed.payload;
                payload.finalized_text_prompt = preview.text.clone();
                Dispatch {
                    prompt: ComposedPrompt::new(preview.text.clone(), preview.request.number_of_images),
                    payload,
                }
            }
            None => {
                let mut request = self.form.snapshot();
                if !self.is_admin() {
                    request.provider = Provider::Gemini;
                    request.effects = None;
                }
                let composed = composer::compose(&request, self.example_image())?;
                Dispatch { prompt: composed.prompt, payload: composed.payload }
            }
        };

        self.in_flight = Some(InFlight {
            style: dispatch.payload.image_style.clone(),
            provider: dispatch.payload.provider,
        });
        self.phase = Phase::Submitting;
        info!(
            session = %self.id,
            provider = %dispatch.payload.provider,
            images = dispatch.payload.number_of_images,
            "image generation submitted"
        );
        Ok(dispatch)
    }

    /// Applies the boundary's answer and returns to `EditingFields`.
    pub fn complete_submission(
        &mut self,
        outcome: Result<GenerationOutput, String>,
    ) -> Result<Notice, SessionError> {
        if self.phase != Phase::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        let in_flight = self.in_flight.take();
        self.phase = Phase::EditingFields;
        self.preview = None;

        let output = match outcome {
            Ok(output) => output,
            Err(message) => {
                info!(
                    session = %self.id,
                    provider = ?in_flight.as_ref().map(|f| f.provider),
                    error = %message,
                    "image generation failed"
                );
                return Ok(Notice::destructive("Error generating images", message));
            }
        };

        let provider = output.provider_used;
        if output.generated_images.is_empty() {
            return Ok(Notice::info(
                "No Images/Tasks Generated",
                format!("Received empty list from {provider}."),
            ));
        }

        let style = in_flight.map(|f| f.style).unwrap_or_default();
        let mut displayable = 0;
        for src in output.generated_images.iter().filter_map(ResultMarker::display_src) {
            self.assets
                .push(GeneratedAsset::new(src, output.prompt_used.clone(), style.clone(), provider));
            displayable += 1;
        }
        let has_pending = output.generated_images.iter().any(|m| m.task_id().is_some());

        self.results = output.generated_images;
        self.last_prompt = Some(output.prompt_used);
        self.last_provider = Some(provider);
        info!(session = %self.id, displayable, has_pending, "image generation applied");

        Ok(if displayable > 0 {
            Notice::info("Success", format!("{displayable} image(s) processed using {provider}."))
        } else if has_pending {
            Notice::info(
                "Freepik Task Started",
                "Freepik image generation task started. Use 'Check Status' to retrieve images.",
            )
        } else {
            Notice::info("No Images/Tasks Generated", format!("Received empty list from {provider}."))
        })
    }

    /// Folds a manually polled task status into the result list.
    pub fn apply_task_status(&mut self, status: TaskStatus) -> Notice {
        let short: String = status.task_id.chars().take(8).collect();
        match status.status {
            TaskState::Completed if !status.images.is_empty() => {
                let hosted: Vec<ResultMarker> =
                    status.images.iter().cloned().map(ResultMarker::Hosted).collect();
                let position = self
                    .results
                    .iter()
                    .position(|m| m.task_id() == Some(status.task_id.as_str()));
                match position {
                    Some(i) => {
                        self.results.splice(i..=i, hosted);
                    }
                    None => {
                        self.results.retain(|m| m.task_id().is_none());
                        self.results.extend(hosted);
                    }
                }
                let prompt = self.last_prompt.clone().unwrap_or_default();
                let style = self.form.snapshot().resolved_style();
                for url in &status.images {
                    self.assets
                        .push(GeneratedAsset::new(url, prompt.clone(), style.clone(), Provider::Freepik));
                }
                info!(task = %status.task_id, images = status.images.len(), "task completed");
                Notice::info(
                    format!("Task {short}... Completed"),
                    format!("{} image(s) retrieved.", status.images.len()),
                )
            }
            TaskState::InProgress => Notice::info(
                format!("Task {short}... Still In Progress"),
                "Please check again in a few moments.",
            ),
            TaskState::Failed => {
                self.results
                    .retain(|m| m.task_id() != Some(status.task_id.as_str()));
                info!(task = %status.task_id, "task failed, placeholder removed");
                Notice::destructive(
                    format!("Task {short}... Failed"),
                    "Freepik failed to generate images for this task.",
                )
            }
            other => Notice::info(
                format!("Task {short}... Status: {other}"),
                "Could not retrieve images or task has an unexpected status.",
            ),
        }
    }

    /// Drops the displayed results and any preview. Assets already generated stay.
    pub fn clear_results(&mut self) {
        self.results.clear();
        self.last_prompt = None;
        self.last_provider = None;
        self.preview = None;
        if self.phase == Phase::PreviewingPrompt {
            self.phase = Phase::EditingFields;
        }
    }

    pub fn first_displayable_result(&self) -> Option<&str> {
        self.results.iter().find_map(ResultMarker::display_src)
    }

    /// Resolves which image, if any, accompanies a social post.
    pub fn social_image_src(&self, choice: Option<SocialImageChoice>) -> Result<Option<String>, SessionError> {
        match choice {
            None => Ok(None),
            Some(SocialImageChoice::Generated) => self
                .first_displayable_result()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| SessionError::Invalid("Please generate a displayable image first.".into())),
            Some(SocialImageChoice::Profile { index }) => self
                .brand
                .example_images
                .get(index)
                .map(|s| Some(s.clone()))
                .ok_or_else(|| SessionError::Invalid(format!("no example image at index {index}"))),
        }
    }

    pub fn add_social_post(&mut self, post: SocialPost) {
        self.social_posts.push(post);
    }

    pub fn set_blog_outline(&mut self, outline: BlogOutline) {
        self.blog_outline = Some(outline);
    }

    pub fn add_blog_post(&mut self, post: BlogPost) {
        self.blog_posts.push(post);
    }
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
            image_style_notes: "clean lines".into(),
            example_images: vec!["data:image/png;base64,AAAA".into()],
            ..Default::default()
        }
    }

    fn output(markers: &[&str], provider: Provider) -> GenerationOutput {
        GenerationOutput {
            generated_images: markers.iter().map(|m| m.parse().unwrap()).collect(),
            prompt_used: "the prompt".into(),
            provider_used: provider,
        }
    }

    #[test]
    fn form_is_seeded_from_brand() {
        let session = StudioSession::new(UserRole::Member, brand());
        assert_eq!(session.form.brand_description, "Eco-friendly skincare");
        assert_eq!(session.form.custom_style_notes, "clean lines");
        assert_eq!(session.form.example_image_index, Some(0));
        assert_eq!(session.example_image(), Some("data:image/png;base64,AAAA"));
        assert_eq!(session.phase, Phase::EditingFields);
    }

    #[test]
    fn switching_to_freepik_resets_ratio_to_first_entry() {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        session
            .update_form(ImageFormPatch { aspect_ratio: Some("16:9".into()), ..Default::default() })
            .unwrap();
        session.set_provider(Provider::Freepik).unwrap();
        assert_eq!(session.form.aspect_ratio, "square_1_1");

        session.set_provider(Provider::Gemini).unwrap();
        assert_eq!(session.form.aspect_ratio, "1:1");
    }

    #[test]
    fn members_are_pinned_to_gemini_and_cannot_preview() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        assert!(matches!(
            session.set_provider(Provider::Freepik),
            Err(SessionError::ProviderNotAllowed(Provider::Freepik))
        ));
        assert!(matches!(session.preview_prompt(), Err(SessionError::AdminOnly(_))));
        assert_eq!(session.phase, Phase::EditingFields);
    }

    #[test]
    fn admin_preview_edit_submit_uses_edited_text() {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        let preview = session.preview_prompt().unwrap();
        assert!(preview.text.contains("Eco-friendly skincare"));
        assert_eq!(session.phase, Phase::PreviewingPrompt);

        session.edit_preview("hand-tuned prompt".into()).unwrap();
        let dispatch = session.begin_submission().unwrap();
        assert_eq!(dispatch.payload.finalized_text_prompt, "hand-tuned prompt");
        assert_eq!(dispatch.prompt.text(), "hand-tuned prompt");
        assert_eq!(session.phase, Phase::Submitting);
        assert!(matches!(session.begin_submission(), Err(SessionError::AlreadySubmitting)));

        session
            .complete_submission(Ok(output(&["data:image/png;base64,BBBB"], Provider::Gemini)))
            .unwrap();
        assert_eq!(session.phase, Phase::EditingFields);
        assert_eq!(session.preview, None);
    }

    #[test]
    fn editing_without_preview_is_rejected() {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        assert!(matches!(session.edit_preview("x".into()), Err(SessionError::NoPreview)));
    }

    #[test]
    fn invalid_form_never_reaches_submitting() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        session
            .update_form(ImageFormPatch { brand_description: Some("  ".into()), ..Default::default() })
            .unwrap();
        assert!(matches!(
            session.begin_submission(),
            Err(SessionError::Compose(ComposeError::MissingBrandDescription))
        ));
        assert_eq!(session.phase, Phase::EditingFields);
    }

    #[test]
    fn success_appends_assets_for_displayable_markers() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        session.begin_submission().unwrap();
        let notice = session
            .complete_submission(Ok(output(
                &["data:image/png;base64,BBBB", "image_url:https://cdn.example/2.png"],
                Provider::Gemini,
            )))
            .unwrap();
        assert_eq!(notice.title, "Success");
        assert_eq!(session.assets.len(), 2);
        assert_eq!(session.assets[1].src, "https://cdn.example/2.png");
        assert_eq!(session.assets[0].style, "photo, professional product photography. clean lines");
        assert_eq!(session.last_prompt.as_deref(), Some("the prompt"));
    }

    #[test]
    fn failure_leaves_collections_untouched() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        session.begin_submission().unwrap();
        session
            .complete_submission(Ok(output(&["data:image/png;base64,BBBB"], Provider::Gemini)))
            .unwrap();
        let before = (session.results.clone(), session.assets.clone());

        session.begin_submission().unwrap();
        let notice = session.complete_submission(Err("quota exceeded".into())).unwrap();
        assert_eq!(notice.severity, Severity::Destructive);
        assert_eq!(notice.description, "quota exceeded");
        assert_eq!((session.results.clone(), session.assets.clone()), before);
        assert_eq!(session.phase, Phase::EditingFields);
    }

    #[test]
    fn completing_without_submitting_is_an_error() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        assert!(matches!(
            session.complete_submission(Err("x".into())),
            Err(SessionError::NotSubmitting)
        ));
    }

    fn with_pending_task(task_id: &str) -> StudioSession {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        session.set_provider(Provider::Freepik).unwrap();
        session.begin_submission().unwrap();
        let notice = session
            .complete_submission(Ok(output(
                &["image_url:https://cdn.example/old.png", &format!("task_id:{task_id}")],
                Provider::Freepik,
            )))
            .unwrap();
        assert_eq!(notice.title, "Success");
        session
    }

    #[test]
    fn completed_task_replaces_its_marker_in_place() {
        let mut session = with_pending_task("task-123456789");
        let assets_before = session.assets.len();
        let notice = session.apply_task_status(TaskStatus {
            task_id: "task-123456789".into(),
            status: TaskState::Completed,
            images: vec!["https://cdn.example/a.png".into(), "https://cdn.example/b.png".into()],
        });
        assert_eq!(notice.title, "Task task-123... Completed");
        assert_eq!(
            session.results.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "image_url:https://cdn.example/old.png",
                "image_url:https://cdn.example/a.png",
                "image_url:https://cdn.example/b.png",
            ]
        );
        assert_eq!(session.assets.len(), assets_before + 2);
    }

    #[test]
    fn failed_task_removes_only_its_marker() {
        let mut session = with_pending_task("t-1");
        session.results.push(ResultMarker::Pending("t-2".into()));
        let notice = session.apply_task_status(TaskStatus {
            task_id: "t-1".into(),
            status: TaskState::Failed,
            images: vec![],
        });
        assert_eq!(notice.severity, Severity::Destructive);
        assert_eq!(
            session.results,
            vec![
                ResultMarker::Hosted("https://cdn.example/old.png".into()),
                ResultMarker::Pending("t-2".into()),
            ]
        );
    }

    #[test]
    fn polling_in_progress_is_idempotent() {
        let mut session = with_pending_task("t-1");
        let before = session.results.clone();
        for _ in 0..3 {
            let notice = session.apply_task_status(TaskStatus {
                task_id: "t-1".into(),
                status: TaskState::InProgress,
                images: vec![],
            });
            assert_eq!(notice.title, "Task t-1... Still In Progress");
        }
        assert_eq!(session.results, before);
    }

    #[test]
    fn clear_drops_results_but_keeps_assets() {
        let mut session = with_pending_task("t-1");
        session.clear_results();
        assert!(session.results.is_empty());
        assert_eq!(session.last_prompt, None);
        assert_eq!(session.assets.len(), 1);
    }

    #[test]
    fn social_image_choices_resolve() {
        let mut session = StudioSession::new(UserRole::Member, brand());
        assert!(session.social_image_src(Some(SocialImageChoice::Generated)).is_err());
        assert_eq!(
            session.social_image_src(Some(SocialImageChoice::Profile { index: 0 })).unwrap().as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        session.results.push(ResultMarker::Pending("t".into()));
        session.results.push(ResultMarker::Hosted("https://cdn.example/x.png".into()));
        assert_eq!(
            session.social_image_src(Some(SocialImageChoice::Generated)).unwrap().as_deref(),
            Some("https://cdn.example/x.png")
        );
    }

    #[test]
    fn patch_rejects_ratio_outside_provider_set() {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        let err = session
            .update_form(ImageFormPatch {
                provider: Some(Provider::Freepik),
                aspect_ratio: Some("16:9".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Invalid(_)));
        assert_eq!(session.form.provider, Provider::Gemini);
        assert_eq!(session.form.aspect_ratio, "1:1");
    }

    #[test]
    fn rejected_patch_leaves_form_untouched() {
        let mut session = StudioSession::new(UserRole::Admin, brand());
        let before = session.form.clone();
        let err = session
            .update_form(ImageFormPatch {
                provider: Some(Provider::Freepik),
                brand_description: Some("changed".into()),
                number_of_images: Some(9),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Invalid(_)));
        assert_eq!(session.form, before);
    }
}
