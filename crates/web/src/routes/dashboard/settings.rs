//! Store settings: profile, logo, storefront link and QR code.
//!
//! This is the one dashboard page that works before the merchant has a
//! store; saving it the first time creates the store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query as QueryParams, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::products::{store_image, validate_image};
use super::{Merchant, MultipartForm, Shell, find_store};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::routes::{FlashQuery, Toast, non_empty, redirect_error, redirect_success};
use crate::services::qr::storefront_qr_svg;
use crate::services::whatsapp::normalize_phone;
use crate::state::AppState;
use crate::supabase::{Caller, Query, Store, StoreInput, tables};

const PAGE_PATH: &str = "/dashboard/settings";

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/settings.html")]
pub struct SettingsTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub has_store: bool,
    pub name: String,
    pub description: String,
    pub whatsapp_number: String,
    pub address: String,
    pub logo_url: Option<String>,
    pub storefront_url: String,
}

/// Store profile form.
#[derive(Debug, Deserialize)]
pub struct StoreForm {
    pub name: String,
    pub description: Option<String>,
    pub whatsapp_number: Option<String>,
    pub address: Option<String>,
}

impl StoreForm {
    /// Validate the form into a row for `user`.
    ///
    /// # Errors
    ///
    /// Returns a flash code when the name is blank or the number is unusable.
    pub fn into_input(self, user: &CurrentUser) -> std::result::Result<StoreInput, &'static str> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("name_required");
        }
        let whatsapp_number = non_empty(self.whatsapp_number);
        if whatsapp_number
            .as_deref()
            .is_some_and(|n| normalize_phone(n).is_none())
        {
            return Err("invalid_phone");
        }
        Ok(StoreInput {
            user_id: user.id,
            name,
            description: non_empty(self.description),
            whatsapp_number,
            address: non_empty(self.address),
            logo_url: None,
        })
    }
}

/// Display the settings form.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, user))]
pub async fn page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(flash): QueryParams<FlashQuery>,
) -> Result<impl IntoResponse> {
    let store = find_store(&state, &user).await?;
    let view = match store {
        Some(store) => {
            let merchant = Merchant { user, store };
            let shell = merchant.shell(&state, "settings");
            let store = merchant.store;
            SettingsTemplate {
                toast: flash.toast(),
                storefront_url: shell.storefront_url.clone(),
                shell,
                has_store: true,
                name: store.name,
                description: store.description.unwrap_or_default(),
                whatsapp_number: store.whatsapp_number.unwrap_or_default(),
                address: store.address.unwrap_or_default(),
                logo_url: store.logo_url,
            }
        }
        None => SettingsTemplate {
            toast: flash.toast(),
            shell: Shell::without_store(&user),
            has_store: false,
            name: String::new(),
            description: String::new(),
            whatsapp_number: String::new(),
            address: String::new(),
            logo_url: None,
            storefront_url: String::new(),
        },
    };
    Ok(view)
}

/// Create the store, or update its profile.
///
/// # Errors
///
/// Returns an error if the store lookup fails.
#[instrument(skip(state, user, form))]
pub async fn save(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<StoreForm>,
) -> Result<Redirect> {
    let input = match form.into_input(&user) {
        Ok(input) => input,
        Err(code) => return Ok(redirect_error(PAGE_PATH, code)),
    };

    let client = state.supabase();
    let caller = Caller::User(&user.access_token);
    let existing = find_store(&state, &user).await?;

    let saved: std::result::Result<Vec<Store>, _> = match &existing {
        Some(store) => {
            client
                .update(
                    caller,
                    tables::STORES,
                    &Query::new().eq("id", store.id).eq("user_id", user.id),
                    &input,
                )
                .await
        }
        None => client.insert(caller, tables::STORES, &input).await,
    };

    Ok(match saved {
        Ok(rows) => {
            if let Some(store) = rows.first() {
                client.invalidate_store(store.id).await;
                info!(store_id = %store.id, created = existing.is_none(), "Store saved");
            }
            redirect_success(PAGE_PATH, "store_saved")
        }
        Err(e) => {
            warn!(error = %e, "Store save failed");
            redirect_error(PAGE_PATH, "store_failed")
        }
    })
}

/// Replace the store logo.
#[instrument(skip(state, merchant, multipart), fields(store_id = %merchant.store.id))]
pub async fn upload_logo(
    State(state): State<AppState>,
    merchant: Merchant,
    multipart: Multipart,
) -> Redirect {
    let file = match MultipartForm::read(multipart).await {
        Ok(mut form) => form.take_file("logo"),
        Err(e) => {
            warn!(error = %e, "Unreadable logo upload");
            None
        }
    };
    let Some(image) = file.and_then(validate_image) else {
        return redirect_error(PAGE_PATH, "logo_failed");
    };

    let client = state.supabase();
    let store_id = merchant.store.id;
    let url = match store_image(client, merchant.caller(), store_id, "logo", image).await {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "Logo upload failed");
            return redirect_error(PAGE_PATH, "logo_failed");
        }
    };

    let updated: std::result::Result<Vec<Store>, _> = client
        .update(
            merchant.caller(),
            tables::STORES,
            &Query::new().eq("id", store_id),
            &json!({ "logo_url": url }),
        )
        .await;
    match updated {
        Ok(_) => {
            client.invalidate_store(store_id).await;
            redirect_success(PAGE_PATH, "logo_saved")
        }
        Err(e) => {
            warn!(error = %e, "Logo URL update failed");
            redirect_error(PAGE_PATH, "logo_failed")
        }
    }
}

/// Storefront QR code as SVG.
///
/// # Errors
///
/// Returns an error if the URL cannot be encoded.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn qr_svg(State(state): State<AppState>, merchant: Merchant) -> Result<Response> {
    let svg = storefront_qr_svg(&state.config().storefront_url(merchant.store.id))?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        svg,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bizgrow_core::UserId;
    use chrono::Utc;
    use secrecy::SecretString;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::random(),
            email: "ravi@example.in".to_string(),
            full_name: Some("Ravi Rao".to_string()),
            access_token: SecretString::from("access"),
            refresh_token: SecretString::from("refresh"),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn form(name: &str, whatsapp: Option<&str>) -> StoreForm {
        StoreForm {
            name: name.to_string(),
            description: Some("  ".to_string()),
            whatsapp_number: whatsapp.map(ToString::to_string),
            address: None,
        }
    }

    #[test]
    fn test_store_form_validation() {
        let input = form(" Rao Stores ", Some("98765 43210")).into_input(&user()).unwrap();
        assert_eq!(input.name, "Rao Stores");
        assert_eq!(input.description, None);
        assert_eq!(input.whatsapp_number.as_deref(), Some("98765 43210"));
        assert!(input.logo_url.is_none());

        assert_eq!(form("  ", None).into_input(&user()).unwrap_err(), "name_required");
        assert_eq!(
            form("Rao Stores", Some("12")).into_input(&user()).unwrap_err(),
            "invalid_phone"
        );
    }
}
