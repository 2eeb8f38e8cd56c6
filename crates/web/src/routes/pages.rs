//! Marketing page route handlers.
//!
//! Serves the markdown content loaded at startup: fixed pages (pricing,
//! about, contact) and the solution and feature collections.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::content::Section;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::routes::Toast;
use crate::routes::home::{CardView, cards};
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub toast: Option<Toast>,
    pub signed_in: bool,
    pub title: String,
    pub description: String,
    /// Breadcrumb back to the section index, if the page belongs to one.
    pub parent: Option<(&'static str, &'static str)>,
    pub content_html: String,
}

/// Section index template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/index.html")]
pub struct SectionIndexTemplate {
    pub toast: Option<Toast>,
    pub signed_in: bool,
    pub title: &'static str,
    pub intro: &'static str,
    pub cards: Vec<CardView>,
}

fn render_page(
    state: &AppState,
    signed_in: bool,
    section: Section,
    slug: &str,
) -> Result<ContentPageTemplate, StatusCode> {
    let page = state
        .content()
        .get(section, slug)
        .ok_or(StatusCode::NOT_FOUND)?;

    let parent = match section {
        Section::Pages => None,
        Section::Solutions => Some(("/solutions", "Solutions")),
        Section::Features => Some(("/features", "Features")),
    };

    Ok(ContentPageTemplate {
        toast: None,
        signed_in,
        title: page.meta.title.clone(),
        description: page.meta.description.clone().unwrap_or_default(),
        parent,
        content_html: page.content_html.clone(),
    })
}

/// Display the pricing page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, user))]
pub async fn pricing(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<impl IntoResponse, StatusCode> {
    render_page(&state, user.is_some(), Section::Pages, "pricing")
}

/// Display the about page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, user))]
pub async fn about(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<impl IntoResponse, StatusCode> {
    render_page(&state, user.is_some(), Section::Pages, "about")
}

/// Display the contact page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, user))]
pub async fn contact(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<impl IntoResponse, StatusCode> {
    render_page(&state, user.is_some(), Section::Pages, "contact")
}

/// List every solution page.
#[instrument(skip(state, user))]
pub async fn solutions_index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> impl IntoResponse {
    SectionIndexTemplate {
        toast: None,
        signed_in: user.is_some(),
        title: "Solutions",
        intro: "BizGrow 360 adapts to the way your shop already works.",
        cards: cards(&state, Section::Solutions, "solutions"),
    }
}

/// Display one solution page.
///
/// # Errors
///
/// Returns 404 if the slug is unknown.
#[instrument(skip(state, user))]
pub async fn solution(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    render_page(&state, user.is_some(), Section::Solutions, &slug)
}

/// List every feature page.
#[instrument(skip(state, user))]
pub async fn features_index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> impl IntoResponse {
    SectionIndexTemplate {
        toast: None,
        signed_in: user.is_some(),
        title: "Features",
        intro: "Everything you need to sell online, in one dashboard.",
        cards: cards(&state, Section::Features, "features"),
    }
}

/// Display one feature page.
///
/// # Errors
///
/// Returns 404 if the slug is unknown.
#[instrument(skip(state, user))]
pub async fn feature(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    render_page(&state, user.is_some(), Section::Features, &slug)
}
