//! Depictions and charts.
//!
//! Every call builds its own backend, so rendering is a pure function of
//! its input. Bitmap text is drawn with an embedded DejaVu Sans, registered
//! with plotters on first use.

mod chart;
mod depict;
mod error;
mod layout;

pub use chart::render_confidence_chart;
pub use depict::{render_2d, render_2d_png};
pub use error::RenderError;
pub use layout::Layout2D;

use std::io::Cursor;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use plotters::style::{register_font, FontStyle};

pub(crate) const FONT_FAMILY: &str = "sans-serif";
static FONT_DATA: &[u8] = include_bytes!("../../resources/fonts/DejaVuSans.ttf");

/// Register the embedded font under [`FONT_FAMILY`]. Other styles fall
/// back to it.
pub(crate) fn ensure_font() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA).is_ok());
    if ok {
        Ok(())
    } else {
        Err(RenderError::Font("embedded DejaVu Sans is not a valid font".to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorImage {
    svg: String,
}

impl VectorImage {
    pub(crate) fn new(svg: String) -> Self {
        Self { svg }
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// `data:image/svg+xml;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(self.svg.as_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded PNG bytes.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

pub(crate) fn encode_png(rgb: Vec<u8>, width: u32, height: u32) -> Result<RasterImage, RenderError> {
    let img = RgbImage::from_raw(width, height, rgb).ok_or(RenderError::InvalidCanvas { width, height })?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(RasterImage { width, height, png })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_payloads() {
        let svg = VectorImage::new("<svg/>".to_owned());
        assert_eq!(svg.data_uri(), "data:image/svg+xml;base64,PHN2Zy8+");
        let png = encode_png(vec![255; 2 * 2 * 3], 2, 2).unwrap();
        assert!(png.to_base64().starts_with("iVBORw0KGgo"));
    }

    #[test]
    fn embedded_font_registers() {
        ensure_font().unwrap();
        ensure_font().unwrap();
    }

    #[test]
    fn short_pixel_buffers_are_rejected() {
        assert!(matches!(
            encode_png(vec![0; 5], 2, 2),
            Err(RenderError::InvalidCanvas { width: 2, height: 2 })
        ));
    }
}
