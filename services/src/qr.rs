use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("token does not fit in a QR code: {0}")]
    Encode(String),
}

/// Turns a token string into a scannable image. A pure transform.
pub trait TokenRenderer: Send + Sync {
    fn render(&self, token: &str, pixel_size: u32) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str;
}

/// Renders tokens as SVG QR codes at least `pixel_size` pixels square.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgQrRenderer;

impl TokenRenderer for SvgQrRenderer {
    fn render(&self, token: &str, pixel_size: u32) -> Result<Vec<u8>, RenderError> {
        let code =
            QrCode::new(token.as_bytes()).map_err(|e| RenderError::Encode(e.to_string()))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(pixel_size, pixel_size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        Ok(image.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}
