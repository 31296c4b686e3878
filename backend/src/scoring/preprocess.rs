use ndarray::{Array3, Array4, Axis};

use super::decoder::{ChannelOrder, PixelArray};
use crate::error::ScoringError;

/// Spatial size the classifier was trained on.
pub const INPUT_SIZE: usize = 32;

pub const CHANNEL_MEAN: [f32; 3] = [0.7369, 0.6360, 0.5318];
pub const CHANNEL_STD: [f32; 3] = [0.3281, 0.3417, 0.3704];

/// Standardized CHW tensor, always `(3, INPUT_SIZE, INPUT_SIZE)`.
#[derive(Debug, Clone)]
pub struct NormalizedTensor(Array3<f32>);

impl NormalizedTensor {
    pub fn into_batch(self) -> Batch {
        Batch(self.0.insert_axis(Axis(0)))
    }
}

/// A single normalized image with a leading batch axis: `(1, 3, 32, 32)`.
#[derive(Debug, Clone)]
pub struct Batch(Array4<f32>);

impl Batch {
    pub fn shape(&self) -> [usize; 4] {
        let (n, c, h, w) = self.0.dim();
        [n, c, h, w]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    /// Values in logical (row-major NCHW) order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.iter().copied().collect()
    }
}

pub fn preprocess(pixels: &PixelArray) -> Result<Batch, ScoringError> {
    let rgb = to_rgb(pixels)?;
    let resized = resize_bilinear(&rgb, INPUT_SIZE, INPUT_SIZE);
    Ok(normalize(&resized).into_batch())
}

/// Returns a 3-channel RGB copy, dropping alpha and swapping BGR input.
pub fn to_rgb(pixels: &PixelArray) -> Result<Array3<u8>, ScoringError> {
    let (height, width, channels) = pixels.data().dim();
    if channels < 3 {
        return Err(ScoringError::InvalidImageShape(format!(
            "expected at least 3 color channels, got {}",
            channels
        )));
    }
    if height == 0 || width == 0 {
        return Err(ScoringError::InvalidImageShape(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    let src = pixels.data();
    let rgb = match pixels.order() {
        ChannelOrder::Rgb => Array3::from_shape_fn((height, width, 3), |(y, x, c)| src[[y, x, c]]),
        ChannelOrder::Bgr => {
            Array3::from_shape_fn((height, width, 3), |(y, x, c)| src[[y, x, 2 - c]])
        }
    };
    Ok(rgb)
}

/// Bilinear resize with half-pixel centers and clamped edges, the same
/// sampling as OpenCV's `INTER_LINEAR` (no antialiasing on downscale).
pub fn resize_bilinear(src: &Array3<u8>, out_height: usize, out_width: usize) -> Array3<u8> {
    let (in_height, in_width, channels) = src.dim();
    let ys: Vec<(usize, usize, f32)> = (0..out_height)
        .map(|dy| sample_coords(dy, in_height, out_height))
        .collect();
    let xs: Vec<(usize, usize, f32)> = (0..out_width)
        .map(|dx| sample_coords(dx, in_width, out_width))
        .collect();

    Array3::from_shape_fn((out_height, out_width, channels), |(dy, dx, c)| {
        let (y0, y1, fy) = ys[dy];
        let (x0, x1, fx) = xs[dx];
        let top = src[[y0, x0, c]] as f32 * (1.0 - fx) + src[[y0, x1, c]] as f32 * fx;
        let bottom = src[[y1, x0, c]] as f32 * (1.0 - fx) + src[[y1, x1, c]] as f32 * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    })
}

fn sample_coords(dst: usize, in_len: usize, out_len: usize) -> (usize, usize, f32) {
    let scale = in_len as f32 / out_len as f32;
    let pos = (dst as f32 + 0.5) * scale - 0.5;
    let base = pos.floor();
    let mut frac = pos - base;
    let mut i0 = base as isize;
    if i0 < 0 {
        i0 = 0;
        frac = 0.0;
    }
    let last = in_len as isize - 1;
    if i0 >= last {
        i0 = last;
        frac = 0.0;
    }
    let i0 = i0 as usize;
    let i1 = (i0 + 1).min(in_len - 1);
    (i0, i1, frac)
}

/// HWC `u8` → CHW `f32`, scaled to [0, 1] then standardized per channel.
pub fn normalize(rgb: &Array3<u8>) -> NormalizedTensor {
    let (height, width, _) = rgb.dim();
    NormalizedTensor(Array3::from_shape_fn((3, height, width), |(c, y, x)| {
        (rgb[[y, x, c]] as f32 / 255.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c]
    }))
}
