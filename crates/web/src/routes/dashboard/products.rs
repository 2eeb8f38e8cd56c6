//! Product management: list, create, edit, delete, bulk actions, CSV.
//!
//! Bulk actions act on the ticked rows with a single request filtered by
//! `id=in.(…)` and the merchant's `store_id`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query as QueryParams, State},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::{Money, ProductId, StoreId};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Merchant, MultipartForm, Shell, UploadedFile, csv_download};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::routes::{Toast, redirect_error, redirect_success};
use crate::services::ai_upload::{MAX_FILE_BYTES, sniff_image_type};
use crate::services::catalog::{CatalogFilter, categories};
use crate::services::csv_io::{self, RowError};
use crate::state::AppState;
use crate::supabase::{
    AvailabilityChange, Caller, Product, ProductInput, Query, SupabaseClient, SupabaseError,
    extension_for, tables,
};

const INDEX_PATH: &str = "/dashboard/products";

// =============================================================================
// Views
// =============================================================================

/// Product row for the list.
#[derive(Clone)]
pub struct ProductRowView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub category: String,
    pub stock_quantity: i32,
    pub is_available: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price.to_string(),
            category: product.category.clone().unwrap_or_default(),
            stock_quantity: product.stock_quantity,
            is_available: product.is_available,
            image_url: product.image_url.clone(),
        }
    }
}

/// Category option of the filter dropdown.
#[derive(Clone)]
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

/// Values shown in the product form.
#[derive(Clone, Default)]
pub struct ProductFormView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub stock_quantity: String,
    pub is_available: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.plain(),
            category: product.category.clone().unwrap_or_default(),
            stock_quantity: product.stock_quantity.to_string(),
            is_available: product.is_available,
            image_url: product.image_url.clone(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products/index.html")]
pub struct ProductsTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub products: Vec<ProductRowView>,
    pub categories: Vec<CategoryOption>,
    pub search: String,
    pub total: usize,
    pub filtered: bool,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products/form.html")]
pub struct ProductFormTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductFormView,
}

/// CSV import result template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products/import.html")]
pub struct ImportResultTemplate {
    pub toast: Option<Toast>,
    pub shell: Shell,
    pub imported: usize,
    pub errors: Vec<String>,
}

/// Query parameters of the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    #[serde(alias = "search")]
    pub q: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Form parsing
// =============================================================================

/// Why a submitted product form was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormProblem {
    NameRequired,
    InvalidPrice,
    InvalidStock,
    BadImage,
}

impl FormProblem {
    const fn code(self) -> &'static str {
        match self {
            Self::NameRequired => "name_required",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidStock => "invalid_stock",
            Self::BadImage => "image_failed",
        }
    }
}

/// Validated product fields from the form, image not yet uploaded.
#[derive(Debug)]
pub struct ProductSubmission {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub is_available: bool,
    pub image: Option<(&'static str, Vec<u8>)>,
}

impl ProductSubmission {
    /// Validate the multipart form.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn parse(mut form: MultipartForm) -> std::result::Result<Self, FormProblem> {
        let name = form.text("name").ok_or(FormProblem::NameRequired)?;
        let price = form
            .text("price")
            .and_then(|raw| Money::parse_input(&raw).ok())
            .ok_or(FormProblem::InvalidPrice)?;
        let stock_quantity = match form.text("stock_quantity") {
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or(FormProblem::InvalidStock)?,
            None => 0,
        };
        let image = match form.take_file("image") {
            Some(file) => Some(validate_image(file).ok_or(FormProblem::BadImage)?),
            None => None,
        };

        Ok(Self {
            name,
            description: form.text("description"),
            price,
            category: form.text("category"),
            stock_quantity,
            is_available: form.checked("is_available"),
            image,
        })
    }

    fn into_input(self, store_id: StoreId, image_url: Option<String>) -> ProductInput {
        ProductInput {
            store_id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            image_url,
            stock_quantity: self.stock_quantity,
            is_available: self.is_available,
        }
    }
}

/// Size and type check for an uploaded image.
pub(crate) fn validate_image(file: UploadedFile) -> Option<(&'static str, Vec<u8>)> {
    if file.bytes.len() > MAX_FILE_BYTES {
        return None;
    }
    let content_type = sniff_image_type(&file.bytes)?;
    Some((content_type, file.bytes))
}

/// Upload an image under the store's folder and return its public URL.
pub(crate) async fn store_image(
    client: &SupabaseClient,
    caller: Caller<'_>,
    store_id: StoreId,
    folder: &str,
    (content_type, bytes): (&'static str, Vec<u8>),
) -> std::result::Result<String, SupabaseError> {
    let path = format!(
        "{store_id}/{folder}/{}.{}",
        Uuid::new_v4(),
        extension_for(content_type)
    );
    client.upload_object(caller, &path, content_type, bytes).await
}

/// Bulk action form, parsed from repeated `ids` fields.
#[derive(Debug, PartialEq, Eq)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub ids: Vec<ProductId>,
}

/// Action applied to every selected product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Enable,
    Disable,
    Delete,
}

impl BulkRequest {
    /// Parse `action=…&ids=…&ids=…`; unknown IDs are ignored.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        let mut action = None;
        let mut ids = Vec::new();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "action" => {
                    action = match value.as_ref() {
                        "enable" => Some(BulkAction::Enable),
                        "disable" => Some(BulkAction::Disable),
                        "delete" => Some(BulkAction::Delete),
                        _ => None,
                    };
                }
                "ids" => {
                    if let Ok(id) = value.parse::<ProductId>()
                        && !ids.contains(&id)
                    {
                        ids.push(id);
                    }
                }
                _ => {}
            }
        }
        Some(Self {
            action: action?,
            ids,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn load_product(
    state: &AppState,
    merchant: &Merchant,
    id: ProductId,
) -> Result<Product> {
    state
        .supabase()
        .select_one(
            merchant.caller(),
            tables::PRODUCTS,
            Query::new().eq("id", id).eq("store_id", merchant.store.id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Display the product list with category filter and name search.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn index(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(query): QueryParams<ProductListQuery>,
) -> Result<impl IntoResponse> {
    let products: Vec<Product> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::PRODUCTS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .order("created_at", false),
        )
        .await?;

    let filter = CatalogFilter {
        category: query.category.clone(),
        search: query.q.clone(),
    };
    let selected = filter.category();
    let category_options = categories(&products)
        .into_iter()
        .map(|name| CategoryOption {
            selected: selected.is_some_and(|s| s.eq_ignore_ascii_case(&name)),
            name,
        })
        .collect();
    let flash = crate::routes::FlashQuery {
        error: query.error.clone(),
        success: query.success.clone(),
    };

    Ok(ProductsTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "products"),
        products: filter
            .apply(&products)
            .into_iter()
            .map(ProductRowView::from)
            .collect(),
        categories: category_options,
        search: filter.search().unwrap_or_default().to_string(),
        total: products.len(),
        filtered: filter.is_active(),
    })
}

/// Display the empty product form.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn new_product(
    State(state): State<AppState>,
    merchant: Merchant,
    QueryParams(flash): QueryParams<crate::routes::FlashQuery>,
) -> impl IntoResponse {
    ProductFormTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "products"),
        heading: "Add product",
        action: INDEX_PATH.to_string(),
        form: ProductFormView {
            is_available: true,
            stock_quantity: "0".to_string(),
            ..ProductFormView::default()
        },
    }
}

/// Create a product.
#[instrument(skip(state, merchant, multipart), fields(store_id = %merchant.store.id))]
pub async fn create(
    State(state): State<AppState>,
    merchant: Merchant,
    multipart: Multipart,
) -> Response {
    let back = "/dashboard/products/new";
    let submission = match MultipartForm::read(multipart).await {
        Ok(form) => ProductSubmission::parse(form),
        Err(e) => {
            warn!(error = %e, "Unreadable product form");
            return redirect_error(back, "product_failed").into_response();
        }
    };
    let mut submission = match submission {
        Ok(submission) => submission,
        Err(problem) => return redirect_error(back, problem.code()).into_response(),
    };

    let client = state.supabase();
    let store_id = merchant.store.id;
    let image_url = match submission.image.take() {
        Some(image) => {
            match store_image(client, merchant.caller(), store_id, "products", image).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "Product image upload failed");
                    return redirect_error(back, "image_failed").into_response();
                }
            }
        }
        None => None,
    };

    let input = submission.into_input(store_id, image_url);
    let created: std::result::Result<Vec<Product>, _> = client
        .insert(merchant.caller(), tables::PRODUCTS, &input)
        .await;
    match created {
        Ok(_) => {
            client.invalidate_store(store_id).await;
            info!(name = %input.name, "Product created");
            redirect_success(INDEX_PATH, "product_saved").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Product insert failed");
            redirect_error(back, "product_failed").into_response()
        }
    }
}

/// Display the edit form.
///
/// # Errors
///
/// Returns 404 if the product is not in the merchant's store.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn edit(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<ProductId>,
    QueryParams(flash): QueryParams<crate::routes::FlashQuery>,
) -> Result<impl IntoResponse> {
    let product = load_product(&state, &merchant, id).await?;
    Ok(ProductFormTemplate {
        toast: flash.toast(),
        shell: merchant.shell(&state, "products"),
        heading: "Edit product",
        action: format!("{INDEX_PATH}/{id}"),
        form: ProductFormView::from(&product),
    })
}

/// Save changes to a product. The current image is kept unless a new one
/// is uploaded.
///
/// # Errors
///
/// Returns 404 if the product is not in the merchant's store.
#[instrument(skip(state, merchant, multipart), fields(store_id = %merchant.store.id))]
pub async fn update(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let back = format!("{INDEX_PATH}/{id}/edit");
    let existing = load_product(&state, &merchant, id).await?;

    let submission = match MultipartForm::read(multipart).await {
        Ok(form) => ProductSubmission::parse(form),
        Err(e) => {
            warn!(error = %e, "Unreadable product form");
            return Ok(redirect_error(&back, "product_failed").into_response());
        }
    };
    let mut submission = match submission {
        Ok(submission) => submission,
        Err(problem) => return Ok(redirect_error(&back, problem.code()).into_response()),
    };

    let client = state.supabase();
    let store_id = merchant.store.id;
    let image_url = match submission.image.take() {
        Some(image) => {
            match store_image(client, merchant.caller(), store_id, "products", image).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "Product image upload failed");
                    return Ok(redirect_error(&back, "image_failed").into_response());
                }
            }
        }
        None => existing.image_url,
    };

    let input = submission.into_input(store_id, image_url);
    let updated: std::result::Result<Vec<Product>, _> = client
        .update(
            merchant.caller(),
            tables::PRODUCTS,
            &Query::new().eq("id", id).eq("store_id", store_id),
            &input,
        )
        .await;
    Ok(match updated {
        Ok(_) => {
            client.invalidate_store(store_id).await;
            redirect_success(INDEX_PATH, "product_saved").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Product update failed");
            redirect_error(&back, "product_failed").into_response()
        }
    })
}

/// Delete one product.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn delete(
    State(state): State<AppState>,
    merchant: Merchant,
    Path(id): Path<ProductId>,
) -> Redirect {
    let client = state.supabase();
    let store_id = merchant.store.id;
    match client
        .delete(
            merchant.caller(),
            tables::PRODUCTS,
            &Query::new().eq("id", id).eq("store_id", store_id),
        )
        .await
    {
        Ok(_) => {
            client.invalidate_store(store_id).await;
            redirect_success(INDEX_PATH, "product_deleted")
        }
        Err(e) => {
            warn!(error = %e, "Product delete failed");
            redirect_error(INDEX_PATH, "product_failed")
        }
    }
}

/// Enable, disable or delete every selected product in one request.
#[instrument(skip(state, merchant, body), fields(store_id = %merchant.store.id))]
pub async fn bulk(State(state): State<AppState>, merchant: Merchant, body: Bytes) -> Redirect {
    let Some(request) = BulkRequest::parse(&body) else {
        return redirect_error(INDEX_PATH, "bulk_failed");
    };
    if request.ids.is_empty() {
        return redirect_error(INDEX_PATH, "nothing_selected");
    }

    let client = state.supabase();
    let store_id = merchant.store.id;
    let selection = Query::new()
        .in_list("id", &request.ids)
        .eq("store_id", store_id);

    let count = request.ids.len().to_string();
    add_breadcrumb(
        "products",
        "Bulk action",
        Some(&[("count", count.as_str())]),
    );

    let outcome = match request.action {
        BulkAction::Enable | BulkAction::Disable => {
            let change = AvailabilityChange {
                is_available: request.action == BulkAction::Enable,
            };
            client
                .update::<_, Product>(merchant.caller(), tables::PRODUCTS, &selection, &change)
                .await
                .map(|rows| rows.len())
        }
        BulkAction::Delete => {
            client
                .delete(merchant.caller(), tables::PRODUCTS, &selection)
                .await
        }
    };

    match outcome {
        Ok(affected) => {
            client.invalidate_store(store_id).await;
            info!(action = ?request.action, affected, "Bulk product action");
            let code = match request.action {
                BulkAction::Enable => "bulk_enabled",
                BulkAction::Disable => "bulk_disabled",
                BulkAction::Delete => "bulk_deleted",
            };
            redirect_success(INDEX_PATH, code)
        }
        Err(e) => {
            warn!(error = %e, "Bulk product action failed");
            redirect_error(INDEX_PATH, "bulk_failed")
        }
    }
}

/// Download the catalogue as CSV.
///
/// # Errors
///
/// Returns an error if the backend or CSV writer fails.
#[instrument(skip(state, merchant), fields(store_id = %merchant.store.id))]
pub async fn export_csv(State(state): State<AppState>, merchant: Merchant) -> Result<Response> {
    let products: Vec<Product> = state
        .supabase()
        .select(
            merchant.caller(),
            tables::PRODUCTS,
            &Query::new()
                .eq("store_id", merchant.store.id)
                .order("name", true),
        )
        .await?;
    let bytes = csv_io::export_products(&products)?;
    Ok(csv_download("products.csv", bytes))
}

/// Import products from an uploaded CSV. Valid rows are inserted in one
/// request; rejected rows are listed on the result page.
#[instrument(skip(state, merchant, multipart), fields(store_id = %merchant.store.id))]
pub async fn import_csv(
    State(state): State<AppState>,
    merchant: Merchant,
    multipart: Multipart,
) -> Response {
    let file = match MultipartForm::read(multipart).await {
        Ok(mut form) => form.take_file("file"),
        Err(e) => {
            warn!(error = %e, "Unreadable import upload");
            None
        }
    };
    let Some(file) = file else {
        return redirect_error(INDEX_PATH, "import_failed").into_response();
    };

    let store_id = merchant.store.id;
    let report = match csv_io::import_products(&file.bytes, store_id) {
        Ok(report) => report,
        Err(e) => {
            info!(error = %e, file = %file.file_name, "Rejected product CSV");
            return ImportResultTemplate {
                toast: Some(Toast::error(e.to_string())),
                shell: merchant.shell(&state, "products"),
                imported: 0,
                errors: Vec::new(),
            }
            .into_response();
        }
    };

    let mut errors: Vec<String> = report.errors.iter().map(RowError::to_string).collect();
    let mut imported = 0;
    if !report.products.is_empty() {
        let client = state.supabase();
        let inserted: std::result::Result<Vec<Product>, _> = client
            .insert(merchant.caller(), tables::PRODUCTS, &report.products)
            .await;
        match inserted {
            Ok(rows) => {
                imported = rows.len();
                client.invalidate_store(store_id).await;
            }
            Err(e) => {
                warn!(error = %e, "Product import insert failed");
                errors.insert(0, "The backend rejected the valid rows; nothing was imported.".to_string());
            }
        }
    }
    info!(imported, rejected = report.errors.len(), "Product CSV imported");

    ImportResultTemplate {
        toast: (imported > 0).then(|| Toast::success(format!("Imported {imported} products."))),
        shell: merchant.shell(&state, "products"),
        imported,
        errors,
    }
    .into_response()
}
