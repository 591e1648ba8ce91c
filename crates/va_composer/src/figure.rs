use std::io::Cursor;

use image::{GenericImageView, ImageFormat};
use va_core::{Error, FigureRef, Fetcher, Result};

use crate::slide::Frame;

/// A decoded figure, re-encoded as PNG for embedding.
#[derive(Debug, Clone)]
pub struct PreparedFigure {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Retrieves the raw image bytes behind a figure reference.
pub async fn load(figure: &FigureRef, fetcher: &Fetcher) -> Result<Vec<u8>> {
    match figure {
        FigureRef::Url { url } => Ok(fetcher.get_bytes(url).await?.bytes),
        FigureRef::Inline { data, .. } => FigureRef::decode_inline(data),
    }
}

/// Decodes any supported raster format and re-encodes it as PNG.
pub fn prepare(bytes: &[u8]) -> Result<PreparedFigure> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::Render(format!("Failed to decode figure image: {}", e)))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Render("Figure image has no pixels".to_string()));
    }

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::Render(format!("Failed to encode figure as PNG: {}", e)))?;

    Ok(PreparedFigure { png, width, height })
}

/// Largest frame with the image's aspect ratio that fits in `region`, centred in it.
pub fn fit_within(region: Frame, width: u32, height: u32) -> Frame {
    if width == 0 || height == 0 || region.cx <= 0 || region.cy <= 0 {
        return region;
    }
    let scale = f64::min(
        region.cx as f64 / width as f64,
        region.cy as f64 / height as f64,
    );
    let cx = ((width as f64 * scale).round() as i64).min(region.cx);
    let cy = ((height as f64 * scale).round() as i64).min(region.cy);

    Frame {
        x: region.x + (region.cx - cx) / 2,
        y: region.y + (region.cy - cy) / 2,
        cx,
        cy,
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: Frame = Frame { x: 1000, y: 2000, cx: 4000, cy: 2000 };

    #[test]
    fn test_fit_wide_image() {
        // 4:1 image in a 2:1 box: full width, centred vertically
        let frame = fit_within(REGION, 400, 100);
        assert_eq!(frame, Frame { x: 1000, y: 2500, cx: 4000, cy: 1000 });
    }

    #[test]
    fn test_fit_tall_image() {
        let frame = fit_within(REGION, 100, 200);
        assert_eq!(frame, Frame { x: 2500, y: 2000, cx: 1000, cy: 2000 });
    }

    #[test]
    fn test_fit_degenerate_image_keeps_region() {
        assert_eq!(fit_within(REGION, 0, 10), REGION);
    }

    #[test]
    fn test_prepare_reencodes_png() {
        let figure = prepare(&sample_png(8, 4)).unwrap();
        assert_eq!((figure.width, figure.height), (8, 4));
        assert!(figure.png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(b"<html>not an image</html>").unwrap_err();
        assert_eq!(err.kind(), "render_error");
    }

    #[tokio::test]
    async fn test_load_inline() {
        let fetcher = Fetcher::new(std::time::Duration::from_secs(1)).unwrap();
        let figure = FigureRef::inline("image/png", &sample_png(2, 2));
        let bytes = load(&figure, &fetcher).await.unwrap();
        assert!(prepare(&bytes).is_ok());
    }
}
