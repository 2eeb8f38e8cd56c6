//! Cached public catalogue reads.
//!
//! Storefront visitors are anonymous, so every visitor sees the same store and
//! product list. These reads go through a short-lived `moka` cache; dashboard
//! writes call [`SupabaseClient::invalidate_store`] so merchants see their
//! changes on the storefront without waiting for the TTL.

use std::sync::Arc;

use bizgrow_core::StoreId;
use tracing::{debug, instrument};

use super::{Caller, Product, Query, Store, SupabaseClient, SupabaseError, tables};

/// Cache key for public catalogue reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Store(StoreId),
    AvailableProducts(StoreId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Store(Box<Store>),
    Products(Arc<Vec<Product>>),
}

impl SupabaseClient {
    /// Fetch a store for its public storefront.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::NotFound`] if the store does not exist, or
    /// another error if the request fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn public_store(&self, store_id: StoreId) -> Result<Store, SupabaseError> {
        let key = CacheKey::Store(store_id);
        if let Some(CacheValue::Store(store)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for store");
            return Ok(*store);
        }

        let store: Store = self
            .select_one(Caller::Anon, tables::STORES, Query::new().eq("id", store_id))
            .await?
            .ok_or_else(|| SupabaseError::NotFound(format!("store {store_id}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Store(Box::new(store.clone())))
            .await;
        Ok(store)
    }

    /// Fetch the available products of a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn public_products(
        &self,
        store_id: StoreId,
    ) -> Result<Arc<Vec<Product>>, SupabaseError> {
        let key = CacheKey::AvailableProducts(store_id);
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let query = Query::new()
            .eq("store_id", store_id)
            .eq("is_available", true)
            .order("created_at", false);
        let products = Arc::new(
            self.select::<Product>(Caller::Anon, tables::PRODUCTS, &query)
                .await?,
        );

        self.inner
            .cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Drop cached catalogue data for a store.
    pub async fn invalidate_store(&self, store_id: StoreId) {
        self.inner.cache.invalidate(&CacheKey::Store(store_id)).await;
        self.inner
            .cache
            .invalidate(&CacheKey::AvailableProducts(store_id))
            .await;
    }
}
