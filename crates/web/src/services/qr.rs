//! SVG QR codes for storefront links.

use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Failed to generate QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Render `data` as a black-on-white SVG at least 200px square.
///
/// # Errors
///
/// Returns an error if the data is too long to fit in a QR code.
pub fn storefront_qr_svg(data: &str) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_qr_svg() {
        let svg = storefront_qr_svg("https://bizgrow.example.in/store/6f1c2a7e").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[test]
    fn test_storefront_qr_svg_too_long() {
        let data = "x".repeat(8000);
        assert!(storefront_qr_svg(&data).is_err());
    }
}
