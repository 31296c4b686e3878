use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

use crate::error::ScoringError;
use crate::scoring::PixelArray;
use crate::scoring::preprocess::to_rgb;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(transparent)]
    Pixels(#[from] ScoringError),
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Re-encodes the submitted image as a JPEG `data:` URL for the checkout page.
pub fn jpeg_data_url(pixels: &PixelArray) -> Result<String, PreviewError> {
    let rgb = to_rgb(pixels)?;
    let (height, width, _) = rgb.dim();
    let raw: Vec<u8> = rgb.iter().copied().collect();
    let image = RgbImage::from_raw(width as u32, height as u32, raw).ok_or_else(|| {
        ScoringError::InvalidImageShape(format!("cannot build {}x{} preview", width, height))
    })?;

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buf, ImageFormat::Jpeg)?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        STANDARD.encode(buf.into_inner())
    ))
}
