//! Category and name filtering shared by the dashboard and the storefront.

use serde::Deserialize;

use crate::supabase::Product;

/// Query-string filter for product lists.
///
/// Both predicates must match: the category is compared exactly
/// (ignoring case), and the search term is a case-insensitive substring
/// of the product name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "q")]
    pub search: Option<String>,
}

impl CatalogFilter {
    /// Selected category, ignoring blank values and the "all" chip.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    /// Trimmed search term, ignoring blank values.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether any predicate is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.category().is_some() || self.search().is_some()
    }

    /// Whether `product` passes both predicates.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self.category().is_none_or(|wanted| {
            product
                .category
                .as_deref()
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(wanted))
        });
        let search_ok = self.search().is_none_or(|term| {
            product.name.to_lowercase().contains(&term.to_lowercase())
        });
        category_ok && search_ok
    }

    /// Products passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct non-empty categories, sorted case-insensitively.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in products.iter().filter_map(|p| p.category.as_deref()) {
        let category = category.trim();
        if !category.is_empty() && !seen.iter().any(|s| s.eq_ignore_ascii_case(category)) {
            seen.push(category.to_string());
        }
    }
    seen.sort_by_key(|c| c.to_lowercase());
    seen
}
