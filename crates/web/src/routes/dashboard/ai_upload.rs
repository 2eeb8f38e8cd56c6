//! AI product upload pages.
//!
//! The whole detection run happens inside the upload POST. The resulting
//! [`AiUploadState`] is stored in the session and the browser is redirected
//! to the page, which renders the phase stepper and the review cards.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query as QueryParams, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::{Merchant, MultipartForm, Shell};
use crate::error::Result;
use crate::filters;
use crate::routes::{FlashQuery, Toast, redirect_error, redirect_success};
use crate::services::ai_upload::{
    AiPhase, AiUploadFlow, AiUploadState, ImageUpload, MAX_FILE_BYTES, MAX_FILES,
    MerchantBackend, SESSION_KEY,
};
use crate::state::AppState;
use crate::supabase::{Product, tables};

const PAGE_PATH: &str = "/dashboard/ai-upload";

/// Step of the progress stepper.
#[derive(Clone)]
pub struct StepView {
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

/// A draft rendered as an editable card.
#[derive(Clone)]
pub struct DraftView {
    pub index: usize,
    pub name: String,
    pub price: String,
    pub category: String,
    pub description: String,
    pub image_url: Option<String>,
    pub selected: bool,
}

/// AI upload page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/ai_upload.html")]
pub struct AiUploadTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub phase: &'static str,
    /// Comma-separated phases of the last run, for `data-phase-history`.
    pub history: String,
    pub steps: Vec<StepView>,
    pub has_results: bool,
    pub drafts: Vec<DraftView>,
    pub errors: Vec<String>,
    pub max_files: usize,
    pub max_file_mb: usize,
}

impl AiUploadTemplate {
    fn build(toast: Option<Toast>, shell: Shell, state: &AiUploadState) -> Self {
        let phase = state.phase();
        let current_step = AiPhase::SEQUENCE.iter().position(|p| *p == phase);
        let steps = AiPhase::SEQUENCE
            .iter()
            .enumerate()
            .map(|(index, step)| StepView {
                label: step.label(),
                reached: current_step.is_some_and(|c| index <= c),
                current: *step == phase,
            })
            .collect();

        let (drafts, errors) = state.results.as_ref().map_or_else(
            || (Vec::new(), Vec::new()),
            |results| {
                let drafts = results
                    .drafts
                    .iter()
                    .enumerate()
                    .map(|(index, draft)| DraftView {
                        index,
                        name: draft.name.clone(),
                        price: draft.price.plain(),
                        category: draft.category.clone().unwrap_or_default(),
                        description: draft.description.clone().unwrap_or_default(),
                        image_url: draft.image_url.clone(),
                        selected: draft.selected,
                    })
                    .collect();
                (drafts, results.errors.clone())
            },
        );

        Self {
            toast,
            shell,
            phase: phase.as_str(),
            history: state
                .history
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(","),
            steps,
            has_results: phase == AiPhase::Results && state.results.is_some(),
            drafts,
            errors,
            max_files: MAX_FILES,
            max_file_mb: MAX_FILE_BYTES / (1024 * 1024),
        }
    }
}

async fn load_state(session: &Session) -> AiUploadState {
    session
        .get::<AiUploadState>(SESSION_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Display the upload form, or the review cards of the last run.
#[instrument(skip(state, merchant, session), fields(store_id = %merchant.store.id))]
pub async fn page(
    State(state): State<AppState>,
    merchant: Merchant,
    session: Session,
    QueryParams(flash): QueryParams<FlashQuery>,
) -> impl IntoResponse {
    let upload_state = load_state(&session).await;
    AiUploadTemplate::build(
        flash.toast(),
        merchant.shell(&state, "ai_upload"),
        &upload_state,
    )
}

/// Run detection over the uploaded photos.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, merchant, session, multipart), fields(store_id = %merchant.store.id))]
pub async fn upload(
    State(state): State<AppState>,
    merchant: Merchant,
    session: Session,
    multipart: Multipart,
) -> Result<Redirect> {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "Unreadable AI upload");
            return Ok(redirect_error(PAGE_PATH, "too_large"));
        }
    };
    let images: Vec<ImageUpload> = form
        .files
        .into_iter()
        .filter(|file| file.field == "images")
        .map(|file| ImageUpload {
            file_name: file.file_name,
            bytes: file.bytes,
        })
        .collect();

    let backend = MerchantBackend {
        client: state.supabase(),
        access_token: &merchant.user.access_token,
    };
    let mut flow = AiUploadFlow::new();
    let outcome = flow.run(&backend, merchant.store.id, images).await;

    match outcome {
        Ok(results) => {
            session
                .insert(SESSION_KEY, flow.into_state(Some(results)))
                .await?;
            Ok(Redirect::to(PAGE_PATH))
        }
        Err(e) => {
            session.insert(SESSION_KEY, flow.into_state(None)).await?;
            Ok(redirect_error(PAGE_PATH, e.code()))
        }
    }
}

/// Insert the selected drafts in one request.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
#[instrument(skip(state, merchant, session, form), fields(store_id = %merchant.store.id))]
pub async fn save(
    State(state): State<AppState>,
    merchant: Merchant,
    session: Session,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect> {
    let Some(results) = load_state(&session).await.results else {
        return Ok(redirect_error(PAGE_PATH, "nothing_selected"));
    };
    let store_id = merchant.store.id;
    let inputs = match results.to_inputs(store_id, &form) {
        Ok(inputs) => inputs,
        Err(e) => return Ok(redirect_error(PAGE_PATH, e.code())),
    };

    let client = state.supabase();
    let inserted: std::result::Result<Vec<Product>, _> = client
        .insert(merchant.caller(), tables::PRODUCTS, &inputs)
        .await;
    match inserted {
        Ok(rows) => {
            client.invalidate_store(store_id).await;
            session.remove::<AiUploadState>(SESSION_KEY).await?;
            info!(saved = rows.len(), "AI drafts saved");
            Ok(redirect_success("/dashboard/products", "ai_saved"))
        }
        Err(e) => {
            warn!(error = %e, "AI draft insert failed");
            Ok(redirect_error(PAGE_PATH, "product_failed"))
        }
    }
}

/// Throw away the last run's results.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(merchant, session), fields(store_id = %merchant.store.id))]
pub async fn discard(merchant: Merchant, session: Session) -> Result<Redirect> {
    session.remove::<AiUploadState>(SESSION_KEY).await?;
    Ok(redirect_success(PAGE_PATH, "ai_discarded"))
}
