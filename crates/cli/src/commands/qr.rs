//! Storefront QR code export.

use std::path::Path;

use bizgrow_core::StoreId;
use bizgrow_web::services::qr::{QrError, storefront_qr_svg};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrCommandError {
    #[error("Missing base URL: pass --base-url or set BIZGROW_BASE_URL")]
    MissingBaseUrl,

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Public catalogue URL of `store_id` under `base_url`.
fn storefront_url(base_url: &str, store_id: StoreId) -> String {
    format!("{}/store/{store_id}", base_url.trim_end_matches('/'))
}

/// Write the QR code for `store_id`'s storefront.
///
/// # Errors
///
/// Returns an error if no base URL is available or the file cannot be written.
pub fn write(
    store_id: StoreId,
    base_url: Option<String>,
    out: Option<&Path>,
) -> Result<(), QrCommandError> {
    dotenvy::dotenv().ok();
    let base_url = base_url
        .or_else(|| std::env::var("BIZGROW_BASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .ok_or(QrCommandError::MissingBaseUrl)?;

    let url = storefront_url(&base_url, store_id);
    let svg = storefront_qr_svg(&url)?;
    super::write_output(out, svg.as_bytes())?;

    tracing::info!(%url, "QR code written");
    Ok(())
}
