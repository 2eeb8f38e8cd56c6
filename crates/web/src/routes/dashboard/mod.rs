//! Merchant dashboard.
//!
//! Every page runs as the signed-in user so the backend's row-level
//! security scopes reads and writes to their own store. Handlers take a
//! [`Merchant`], which resolves that store up front; merchants without one
//! are sent to the settings page to create it.

pub mod ai_upload;
pub mod analytics;
pub mod customers;
pub mod delivery;
pub mod orders;
pub mod overview;
pub mod products;
pub mod settings;
pub mod whatsapp;

use std::collections::HashMap;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, multipart::MultipartError},
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::warn;

use crate::error::AppError;
use crate::middleware::{LOGIN_PATH, RequireUser, clear_current_user};
use crate::models::CurrentUser;
use crate::routes::redirect_error;
use crate::services::ai_upload::{MAX_FILE_BYTES, MAX_FILES};
use crate::state::AppState;
use crate::supabase::{Caller, Query, Store, SupabaseError, tables};

/// Room for multipart framing and text fields on top of file bytes.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// A signed-in merchant and their store.
pub struct Merchant {
    pub user: CurrentUser,
    pub store: Store,
}

impl Merchant {
    /// Backend identity for this merchant's requests.
    #[must_use]
    pub const fn caller(&self) -> Caller<'_> {
        Caller::User(&self.user.access_token)
    }

    /// Layout data for a dashboard page.
    #[must_use]
    pub fn shell(&self, state: &AppState, active: &'static str) -> Shell {
        Shell {
            active,
            store_name: self.store.name.clone(),
            user_name: self.user.display_name().to_string(),
            storefront_url: state.config().storefront_url(self.store.id),
        }
    }
}

/// Look up the store owned by `user`.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn find_store(
    state: &AppState,
    user: &CurrentUser,
) -> Result<Option<Store>, SupabaseError> {
    state
        .supabase()
        .select_one(
            Caller::User(&user.access_token),
            tables::STORES,
            Query::new().eq("user_id", user.id),
        )
        .await
}

/// Sign the user out and send them to the login page.
async fn expired_session(parts: &Parts) -> Response {
    if let Some(session) = parts.extensions.get::<Session>()
        && let Err(e) = clear_current_user(session).await
    {
        warn!(error = %e, "Failed to clear rejected session");
    }
    Redirect::to(LOGIN_PATH).into_response()
}

impl FromRequestParts<AppState> for Merchant {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match find_store(state, &user).await {
            Ok(Some(store)) => Ok(Self { user, store }),
            Ok(None) => Err(redirect_error("/dashboard/settings", "store_required").into_response()),
            Err(e) if e.is_auth_failure() => {
                warn!(user_id = %user.id, error = %e, "Backend rejected session");
                Err(expired_session(parts).await)
            }
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}

/// Layout data shared by every dashboard page.
#[derive(Clone)]
pub struct Shell {
    /// Sidebar entry to highlight.
    pub active: &'static str,
    pub store_name: String,
    pub user_name: String,
    pub storefront_url: String,
}

impl Shell {
    /// Shell for a user who has not created a store yet.
    #[must_use]
    pub fn without_store(user: &CurrentUser) -> Self {
        Self {
            active: "settings",
            store_name: "New store".to_string(),
            user_name: user.display_name().to_string(),
            storefront_url: String::new(),
        }
    }
}

/// A file from a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files of a multipart form.
///
/// File inputs left empty by the browser (no file name, no bytes) are
/// skipped.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Read every part of `multipart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed or exceeds the route's limit.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(ToString::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        form.files.push(UploadedFile {
                            field: name,
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text field, `None` when missing or blank.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Whether a checkbox was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// First file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field == name)?;
        Some(self.files.remove(index))
    }
}

/// CSV attachment response.
#[must_use]
pub fn csv_download(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Create the dashboard routes router.
pub fn routes() -> Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(MAX_FILE_BYTES + FORM_OVERHEAD_BYTES);
    let ai_limit = DefaultBodyLimit::max(MAX_FILES * MAX_FILE_BYTES + FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(overview::overview))
        // Products
        .route(
            "/products",
            get(products::index).post(products::create).layer(upload_limit),
        )
        .route("/products/new", get(products::new_product))
        .route("/products/bulk", post(products::bulk))
        .route("/products/export.csv", get(products::export_csv))
        .route(
            "/products/import",
            post(products::import_csv).layer(upload_limit),
        )
        .route("/products/{id}/edit", get(products::edit))
        .route(
            "/products/{id}",
            post(products::update).layer(upload_limit),
        )
        .route("/products/{id}/delete", post(products::delete))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/export.csv", get(orders::export_csv))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/invoice", get(orders::invoice))
        // Customers
        .route("/customers", get(customers::index))
        .route("/customers/export.csv", get(customers::export_csv))
        .route("/customers/{id}", get(customers::show))
        // Analytics
        .route("/analytics", get(analytics::page))
        .route("/analytics/sales.json", get(analytics::sales_json))
        // Delivery
        .route("/delivery", get(delivery::board))
        .route("/delivery/{id}/advance", post(delivery::advance))
        // WhatsApp
        .route("/whatsapp", get(whatsapp::page))
        .route("/whatsapp/compose", post(whatsapp::compose))
        // AI upload
        .route(
            "/ai-upload",
            get(ai_upload::page).post(ai_upload::upload).layer(ai_limit),
        )
        .route("/ai-upload/save", post(ai_upload::save))
        .route("/ai-upload/discard", post(ai_upload::discard))
        // Settings
        .route("/settings", get(settings::page).post(settings::save))
        .route(
            "/settings/logo",
            post(settings::upload_logo).layer(upload_limit),
        )
        .route("/settings/qr.svg", get(settings::qr_svg))
}
