use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Form, Json, Router,
};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    backend::ContentBackend,
    catalog::{self, Catalog},
    composer::{self, ComposedSubmission},
    config::StudioConfig,
    copywriter,
    error::{Result, StudioError},
    gemini::preview,
    models::{
        BlogOutline, BlogOutlineRequest, BlogPost, BlogPostRequest, BrandProfile, GenerationForm,
        GenerationOutput, GenerationPayload, SocialPost, SocialPostRequest,
    },
    normalizer::{self, Normalized},
    session::{ImageFormPatch, Notice, PromptPreview, StudioSession, UserRole},
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, StudioSession>>>,
    pub backend: Arc<dyn ContentBackend>,
    pub config: Arc<StudioConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ContentBackend>, config: StudioConfig) -> Self {
        Self { sessions: Arc::default(), backend, config: Arc::new(config) }
    }

    fn read_session<T>(&self, id: Uuid, f: impl FnOnce(&StudioSession) -> Result<T>) -> Result<T> {
        let guard = self.sessions.read();
        let session = guard.get(&id).ok_or(StudioError::SessionNotFound(id))?;
        f(session)
    }

    fn write_session<T>(&self, id: Uuid, f: impl FnOnce(&mut StudioSession) -> Result<T>) -> Result<T> {
        let mut guard = self.sessions.write();
        let session = guard.get_mut(&id).ok_or(StudioError::SessionNotFound(id))?;
        f(session)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/catalog", get(get_catalog))
        .route("/api/compose", post(compose))
        .route("/api/images/generate", post(generate_images))
        .route("/api/images/normalize", post(normalize_image))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/form", patch(update_form))
        .route("/api/sessions/:id/preview", post(preview_prompt).put(edit_preview))
        .route("/api/sessions/:id/images", post(submit_images).delete(clear_images))
        .route("/api/sessions/:id/tasks/:task_id", post(check_task))
        .route("/api/sessions/:id/social", post(create_social_post))
        .route("/api/sessions/:id/blog/outline", post(create_blog_outline))
        .route("/api/sessions/:id/blog", post(create_blog_post))
        .with_state(state)
}

/// A session snapshot plus the notice produced by the transition, if any.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: StudioSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl SessionResponse {
    fn of(session: &StudioSession) -> Json<Self> {
        Json(Self { session: session.clone(), notice: None })
    }

    fn with_notice(session: &StudioSession, notice: Notice) -> Json<Self> {
        Json(Self { session: session.clone(), notice: Some(notice) })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_email: String,
    #[serde(default)]
    pub brand: BrandProfile,
}

#[derive(Debug, Deserialize)]
pub struct EditPreviewRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub src: String,
    #[serde(default)]
    pub ceiling: Option<usize>,
}

pub async fn get_catalog() -> Json<Catalog> {
    Json(catalog::catalog())
}

pub async fn compose(Form(form): Form<GenerationForm>) -> Result<Json<ComposedSubmission>> {
    let (request, example_image) = form.into_request();
    let submission = composer::compose(&request, example_image.as_deref())?;
    tracing::info!("📝 Composed {} prompt: {}", request.provider, preview(submission.prompt.text()));
    Ok(Json(submission))
}

pub async fn generate_images(
    State(state): State<AppState>,
    Form(payload): Form<GenerationPayload>,
) -> Result<Json<GenerationOutput>> {
    if payload.finalized_text_prompt.trim().is_empty() {
        return Err(StudioError::BadRequest("finalizedTextPrompt must not be empty".into()));
    }
    composer::validate_payload(&payload)?;
    let output = state.backend.generate_images(&payload).await?;
    tracing::info!("✅ {} returned {} result(s)", output.provider_used, output.generated_images.len());
    Ok(Json(output))
}

pub async fn normalize_image(
    State(state): State<AppState>,
    Json(body): Json<NormalizeRequest>,
) -> Result<Json<Normalized>> {
    let ceiling = body.ceiling.unwrap_or(state.config.max_inline_image_bytes);
    let normalized = normalize_blocking(body.src, ceiling).await?;
    tracing::info!("🖼️ Normalized image: {}", preview(normalized.src()));
    Ok(Json(normalized))
}

/// Decode, resize and re-encode run on the blocking pool.
async fn normalize_blocking(src: String, ceiling: usize) -> Result<Normalized> {
    let normalized = tokio::task::spawn_blocking(move || normalizer::normalize_inline_image(&src, ceiling)).await??;
    Ok(normalized)
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Json<SessionResponse> {
    let role = if state.config.is_admin(&body.user_email) { UserRole::Admin } else { UserRole::Member };
    let session = StudioSession::new(role, body.brand);
    tracing::info!("🚀 Session {} created ({:?})", session.id, role);
    let response = SessionResponse::of(&session);
    state.sessions.write().insert(session.id, session);
    response
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionResponse>> {
    state.read_session(id, |s| Ok(SessionResponse::of(s)))
}

pub async fn update_form(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(patch): Json<ImageFormPatch>,
) -> Result<Json<SessionResponse>> {
    state.write_session(id, |s| {
        s.update_form(patch)?;
        Ok(SessionResponse::of(s))
    })
}

pub async fn preview_prompt(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<PromptPreview>> {
    state.write_session(id, |s| Ok(Json(s.preview_prompt()?.clone())))
}

pub async fn edit_preview(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<EditPreviewRequest>,
) -> Result<Json<SessionResponse>> {
    state.write_session(id, |s| {
        s.edit_preview(body.text)?;
        Ok(SessionResponse::of(s))
    })
}

/// Submits the current form (or an admin's reviewed preview). Provider
/// failures are folded into the session before being reported.
///
/// The provider call and its write-back run on their own task, so a client
/// that disconnects mid-call still leaves the session out of `Submitting`.
pub async fn submit_images(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionResponse>> {
    let dispatch = state.write_session(id, |s| Ok(s.begin_submission()?))?;
    tracing::info!("🎯 Session {} submitting: {}", id, preview(dispatch.prompt.text()));

    let task = tokio::spawn(async move {
        // lock is not held across the provider call
        let outcome = state.backend.generate_images(&dispatch.payload).await;
        state.write_session(id, |s| match outcome {
            Ok(output) => {
                let notice = s.complete_submission(Ok(output))?;
                Ok(SessionResponse::with_notice(s, notice))
            }
            Err(err) => {
                s.complete_submission(Err(err.to_string()))?;
                Err(err.into())
            }
        })
    });
    task.await?
}

pub async fn clear_images(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionResponse>> {
    state.write_session(id, |s| {
        s.clear_results();
        Ok(SessionResponse::of(s))
    })
}

pub async fn check_task(
    Path((id, task_id)): Path<(Uuid, String)>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>> {
    state.read_session(id, |_| Ok(()))?;
    let status = state.backend.check_task(&task_id).await?;
    state.write_session(id, |s| {
        let notice = s.apply_task_status(status);
        Ok(SessionResponse::with_notice(s, notice))
    })
}

pub async fn create_social_post(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SocialPostRequest>,
) -> Result<Json<SocialPost>> {
    let (image, brand) = state.read_session(id, |s| Ok((s.social_image_src(body.image)?, s.brand.clone())))?;

    let image_src = match image {
        Some(src) => Some(normalize_blocking(src, state.config.max_inline_image_bytes).await?.into_src()),
        None => None,
    };

    let prompt = copywriter::social_caption_prompt(&body, &brand, image_src.is_some());
    let text = state.backend.generate_text(&prompt).await?;
    let caption = copywriter::parse_caption(&text);

    let post = SocialPost {
        id: Uuid::new_v4(),
        platform: "instagram".to_string(),
        image_src,
        image_description: body.image_description.clone(),
        caption: caption.caption,
        hashtags: caption.hashtags,
        tone: copywriter::social_tone(&body),
        created_at: Utc::now(),
    };
    tracing::info!("📣 Social post {} created for session {}", post.id, id);
    state.write_session(id, |s| {
        s.add_social_post(post.clone());
        Ok(Json(post))
    })
}

pub async fn create_blog_outline(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<BlogOutlineRequest>,
) -> Result<Json<BlogOutline>> {
    let brand = state.read_session(id, |s| Ok(s.brand.clone()))?;
    let prompt = copywriter::blog_outline_prompt(&body, &brand).ok_or_else(|| {
        StudioError::BadRequest("a brand name, description or keywords are required for an outline".into())
    })?;
    let outline = BlogOutline { outline: state.backend.generate_text(&prompt).await? };
    state.write_session(id, |s| {
        s.set_blog_outline(outline.clone());
        Ok(Json(outline))
    })
}

pub async fn create_blog_post(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<BlogPostRequest>,
) -> Result<Json<BlogPost>> {
    if body.outline.trim().is_empty() {
        return Err(StudioError::BadRequest("an outline is required to write a blog post".into()));
    }
    let brand = state.read_session(id, |s| Ok(s.brand.clone()))?;
    let text = state.backend.generate_text(&copywriter::blog_post_prompt(&body, &brand)).await?;
    let draft = copywriter::parse_blog_post(&text);

    let post = BlogPost {
        id: Uuid::new_v4(),
        title: draft.title,
        content: draft.content,
        tags: draft.tags,
        platform: body.platform,
        created_at: Utc::now(),
    };
    tracing::info!("📝 Blog post \"{}\" created for session {}", post.title, id);
    state.write_session(id, |s| {
        s.add_blog_post(post.clone());
        Ok(Json(post))
    })
}
