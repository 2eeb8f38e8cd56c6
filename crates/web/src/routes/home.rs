//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::content::{Page, Section};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::routes::{FlashQuery, Toast};
use crate::state::AppState;

/// Card linking to a solution or feature page.
#[derive(Clone)]
pub struct CardView {
    pub href: String,
    pub title: String,
    pub summary: String,
}

impl CardView {
    fn from_page(prefix: &str, page: &Page) -> Self {
        Self {
            href: format!("/{prefix}/{}", page.slug),
            title: page.meta.title.clone(),
            summary: page
                .meta
                .summary
                .clone()
                .or_else(|| page.meta.description.clone())
                .unwrap_or_default(),
        }
    }
}

/// Build cards for every page of a section.
pub(crate) fn cards(state: &AppState, section: Section, prefix: &str) -> Vec<CardView> {
    state
        .content()
        .list(section)
        .iter()
        .map(|page| CardView::from_page(prefix, page))
        .collect()
}

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub toast: Option<Toast>,
    pub signed_in: bool,
    pub solutions: Vec<CardView>,
    pub features: Vec<CardView>,
}

/// Display the landing page. Signed-in merchants get a dashboard link
/// instead of the sign-up call to action.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Query(flash): Query<FlashQuery>,
) -> impl IntoResponse {
    HomeTemplate {
        toast: flash.toast(),
        signed_in: user.is_some(),
        solutions: cards(&state, Section::Solutions, "solutions"),
        features: cards(&state, Section::Features, "features"),
    }
}
