//! Public storefront route handlers.
//!
//! Storefront visitors are anonymous. Store and product reads go through
//! the cached public catalogue; carts live in the visitor's session.

pub mod cart;
pub mod checkout;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use bizgrow_core::{ProductId, StoreId};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::{FlashQuery, Toast};
use crate::services::cart::Cart;
use crate::services::catalog::{CatalogFilter, categories};
use crate::state::AppState;
use crate::supabase::{Product, Store};

/// Store header shown on every storefront page.
#[derive(Clone)]
pub struct StoreView {
    pub id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
}

impl From<&Store> for StoreView {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            description: store.description.clone(),
            logo_url: store.logo_url.clone(),
            address: store.address.clone(),
        }
    }
}

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            in_stock: product.stock_quantity > 0,
        }
    }
}

/// Category filter chip.
#[derive(Clone)]
pub struct ChipView {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Chips for "All" plus every category, keeping the search term.
fn category_chips(base: &str, all: &[String], filter: &CatalogFilter) -> Vec<ChipView> {
    let search = filter
        .search()
        .map(|q| format!("q={}", urlencoding::encode(q)));
    let href = |category: Option<&str>| {
        let mut params: Vec<String> = Vec::new();
        if let Some(category) = category {
            params.push(format!("category={}", urlencoding::encode(category)));
        }
        params.extend(search.clone());
        if params.is_empty() {
            base.to_string()
        } else {
            format!("{base}?{}", params.join("&"))
        }
    };

    let selected = filter.category();
    std::iter::once(ChipView {
        label: "All".to_string(),
        href: href(None),
        active: selected.is_none(),
    })
    .chain(all.iter().map(|category| ChipView {
        label: category.clone(),
        href: href(Some(category)),
        active: selected.is_some_and(|s| s.eq_ignore_ascii_case(category)),
    }))
    .collect()
}

/// Read a store's cart from the session; a broken entry reads as empty.
pub(crate) async fn load_cart(session: &Session, store_id: StoreId) -> Cart {
    session
        .get::<Cart>(&crate::services::cart::session_key(store_id))
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Catalogue page template.
#[derive(Template, WebTemplate)]
#[template(path = "storefront/catalogue.html")]
pub struct CatalogueTemplate {
    pub toast: Option<Toast>,
    pub store: StoreView,
    pub cart_count: u32,
    pub chips: Vec<ChipView>,
    pub search: String,
    pub category: String,
    pub products: Vec<ProductView>,
    pub filtered: bool,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "storefront/product.html")]
pub struct ProductTemplate {
    pub toast: Option<Toast>,
    pub store: StoreView,
    pub cart_count: u32,
    pub product: ProductView,
    pub in_cart: u32,
    pub max_quantity: u32,
}

/// Query parameters of the catalogue: filter plus flash codes.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CatalogueQuery {
    pub category: Option<String>,
    #[serde(alias = "search")]
    pub q: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display a store's catalogue with category chips and search.
///
/// # Errors
///
/// Returns 404 if the store does not exist, or 502 if the backend fails.
#[instrument(skip(state, session))]
pub async fn catalogue(
    State(state): State<AppState>,
    session: Session,
    Path(store_id): Path<StoreId>,
    Query(query): Query<CatalogueQuery>,
) -> Result<impl IntoResponse> {
    let store = state.supabase().public_store(store_id).await?;
    let products = state.supabase().public_products(store_id).await?;

    let filter = CatalogFilter {
        category: query.category.clone(),
        search: query.q.clone(),
    };
    let base = format!("/store/{store_id}");
    let flash = FlashQuery {
        error: query.error,
        success: query.success,
    };

    Ok(CatalogueTemplate {
        toast: flash.toast(),
        store: StoreView::from(&store),
        cart_count: load_cart(&session, store_id).await.item_count(),
        chips: category_chips(&base, &categories(&products), &filter),
        search: filter.search().unwrap_or_default().to_string(),
        category: filter.category().unwrap_or_default().to_string(),
        products: filter
            .apply(&products)
            .into_iter()
            .map(ProductView::from)
            .collect(),
        filtered: filter.is_active(),
    })
}

/// Display one product with a quantity picker.
///
/// # Errors
///
/// Returns 404 if the store or product does not exist or is hidden.
#[instrument(skip(state, session))]
pub async fn product(
    State(state): State<AppState>,
    session: Session,
    Path((store_id, product_id)): Path<(StoreId, ProductId)>,
    Query(flash): Query<FlashQuery>,
) -> Result<impl IntoResponse> {
    let store = state.supabase().public_store(store_id).await?;
    let products = state.supabase().public_products(store_id).await?;
    let product = products
        .iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let cart = load_cart(&session, store_id).await;

    Ok(ProductTemplate {
        toast: flash.toast(),
        store: StoreView::from(&store),
        cart_count: cart.item_count(),
        product: ProductView::from(product),
        in_cart: cart.quantity(product_id),
        max_quantity: crate::services::cart::MAX_QUANTITY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chips_keep_search_and_mark_active() {
        let filter = CatalogFilter {
            category: Some("snacks".to_string()),
            search: Some("masala chai".to_string()),
        };
        let chips = category_chips(
            "/store/abc",
            &["Beverages".to_string(), "Snacks".to_string()],
            &filter,
        );
        assert_eq!(chips.len(), 3);
        assert_eq!(chips[0].href, "/store/abc?q=masala%20chai");
        assert!(!chips[0].active);
        assert_eq!(chips[2].href, "/store/abc?category=Snacks&q=masala%20chai");
        assert!(chips[2].active);
        assert!(!chips[1].active);
    }

    #[test]
    fn test_chips_without_filter() {
        let chips = category_chips("/store/abc", &["Snacks".to_string()], &CatalogFilter::default());
        assert_eq!(chips[0].href, "/store/abc");
        assert!(chips[0].active);
        assert_eq!(chips[1].href, "/store/abc?category=Snacks");
    }
}
