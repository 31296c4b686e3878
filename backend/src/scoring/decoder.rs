use image::DynamicImage;
use ndarray::Array3;

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Decoded pixels in HWC layout with the source channel depth preserved.
#[derive(Debug, Clone)]
pub struct PixelArray {
    data: Array3<u8>,
    order: ChannelOrder,
}

impl PixelArray {
    pub fn from_rgb(
        width: usize,
        height: usize,
        channels: usize,
        raw: Vec<u8>,
    ) -> Result<Self, ScoringError> {
        Self::from_raw(width, height, channels, raw, ChannelOrder::Rgb)
    }

    pub fn from_bgr(
        width: usize,
        height: usize,
        channels: usize,
        raw: Vec<u8>,
    ) -> Result<Self, ScoringError> {
        Self::from_raw(width, height, channels, raw, ChannelOrder::Bgr)
    }

    fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        raw: Vec<u8>,
        order: ChannelOrder,
    ) -> Result<Self, ScoringError> {
        let len = raw.len();
        let data = Array3::from_shape_vec((height, width, channels), raw).map_err(|_| {
            ScoringError::InvalidImageShape(format!(
                "{} bytes do not fit a {}x{}x{} image",
                len, height, width, channels
            ))
        })?;
        Ok(Self { data, order })
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }
}

/// Decodes an encoded image (JPEG, PNG, or any other format `image` was
/// built with) into 8-bit pixels.
pub fn decode(bytes: &[u8]) -> Result<PixelArray, ScoringError> {
    if bytes.is_empty() {
        return Err(ScoringError::Decode("empty image payload".to_string()));
    }

    let image = image::load_from_memory(bytes)?;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = image.color().channel_count() as usize;

    log::debug!(
        "Decoded {}x{} image with {} channel(s) ({:?})",
        width,
        height,
        channels,
        image.color()
    );

    PixelArray::from_rgb(width, height, channels, narrow_to_u8(image, channels))
}

// 16-bit and float sources are narrowed while keeping their channel count.
fn narrow_to_u8(image: DynamicImage, channels: usize) -> Vec<u8> {
    match (channels, image) {
        (1, DynamicImage::ImageLuma8(buf)) => buf.into_raw(),
        (1, other) => other.to_luma8().into_raw(),
        (2, DynamicImage::ImageLumaA8(buf)) => buf.into_raw(),
        (2, other) => other.to_luma_alpha8().into_raw(),
        (3, DynamicImage::ImageRgb8(buf)) => buf.into_raw(),
        (3, other) => other.to_rgb8().into_raw(),
        (_, DynamicImage::ImageRgba8(buf)) => buf.into_raw(),
        (_, other) => other.to_rgba8().into_raw(),
    }
}
