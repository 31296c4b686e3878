//! Fixtures shared by the scoring unit tests.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat};
use ndarray::Array3;

use super::model::{FreshnessModel, ModelLoader, RawOutputs};
use super::preprocess::{Batch, INPUT_SIZE, normalize};
use crate::error::ScoringError;

pub(crate) fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Returns the same scores for every batch.
pub(crate) struct FixedModel(pub Vec<f32>);

impl FreshnessModel for FixedModel {
    fn forward(&self, _batch: &Batch) -> Result<RawOutputs, ScoringError> {
        Ok(self.0.clone())
    }
}

/// Counts loads and rejects weights that do not start with `ok`.
#[derive(Clone)]
pub(crate) struct CountingLoader {
    pub loads: Arc<AtomicUsize>,
    pub scores: Vec<f32>,
}

impl CountingLoader {
    pub(crate) fn with_scores(scores: Vec<f32>) -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            scores,
        }
    }
}

impl ModelLoader for CountingLoader {
    fn load(&self, weights: &[u8]) -> Result<Box<dyn FreshnessModel>, ScoringError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !weights.starts_with(b"ok") {
            return Err(ScoringError::Inference("corrupt weights".into()));
        }
        Ok(Box::new(FixedModel(self.scores.clone())))
    }
}

pub(crate) fn white_batch() -> Batch {
    normalize(&Array3::from_elem((INPUT_SIZE, INPUT_SIZE, 3), 255u8)).into_batch()
}
