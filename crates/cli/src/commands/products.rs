//! Product CSV export and import through the backend's REST API.
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
//! - `SUPABASE_SERVICE_ROLE_KEY` - validated for length and entropy before use

use std::path::Path;

use bizgrow_core::StoreId;
use bizgrow_web::config::{ConfigError, SupabaseConfig};
use bizgrow_web::services::csv_io::{self, CsvError, ImportReport};
use bizgrow_web::supabase::{Caller, Product, Query, SupabaseClient, SupabaseError, Store, tables};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProductsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store not found: {0}")]
    StoreNotFound(StoreId),
}

fn service_client() -> Result<SupabaseClient, ProductsError> {
    let config = SupabaseConfig::from_env_with_service_role()?;
    Ok(SupabaseClient::new(&config)?)
}

async fn require_store(client: &SupabaseClient, store_id: StoreId) -> Result<Store, ProductsError> {
    client
        .select_one(Caller::Service, tables::STORES, Query::new().eq("id", store_id))
        .await?
        .ok_or(ProductsError::StoreNotFound(store_id))
}

/// Export every product of `store_id` as CSV.
///
/// # Errors
///
/// Returns an error if credentials are missing, the store does not exist, or
/// the output cannot be written.
pub async fn export(store_id: StoreId, out: Option<&Path>) -> Result<(), ProductsError> {
    let client = service_client()?;
    let store = require_store(&client, store_id).await?;

    let products: Vec<Product> = client
        .select(
            Caller::Service,
            tables::PRODUCTS,
            &Query::new().eq("store_id", store_id).order("name", true),
        )
        .await?;
    let bytes = csv_io::export_products(&products)?;
    super::write_output(out, &bytes)?;

    tracing::info!(store = %store.name, count = products.len(), "Products exported");
    Ok(())
}

/// Log every rejected row of an import.
fn report_rejections(report: &ImportReport) {
    for error in &report.errors {
        tracing::warn!("{error}");
    }
}

/// Import products from `file` into `store_id` in one insert.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the backend
/// rejects the insert.
pub async fn import(store_id: StoreId, file: &Path, dry_run: bool) -> Result<(), ProductsError> {
    let content = std::fs::read(file)?;
    let report = csv_io::import_products(&content, store_id)?;
    report_rejections(&report);

    if dry_run {
        tracing::info!(
            valid = report.products.len(),
            rejected = report.errors.len(),
            "Dry run, nothing inserted"
        );
        return Ok(());
    }
    if report.products.is_empty() {
        tracing::warn!("No valid rows to import");
        return Ok(());
    }

    let client = service_client()?;
    let store = require_store(&client, store_id).await?;
    let inserted: Vec<Product> = client
        .insert(Caller::Service, tables::PRODUCTS, &report.products)
        .await?;

    tracing::info!(
        store = %store.name,
        imported = inserted.len(),
        rejected = report.errors.len(),
        "Products imported"
    );
    Ok(())
}
