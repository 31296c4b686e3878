use std::sync::Arc;

use shared::FreshnessLabel;

use super::decoder::{self, PixelArray};
use super::model::{ModelCell, ModelInfo};
use super::postprocess;
use super::preprocess;
use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessReport {
    pub freshness_percentage: u8,
    pub freshness_label: FreshnessLabel,
    pub price: u32,
}

impl FreshnessReport {
    pub fn from_percentage(percentage: u8) -> Self {
        Self {
            freshness_percentage: percentage,
            freshness_label: postprocess::freshness_label(percentage),
            price: postprocess::price(percentage),
        }
    }
}

/// Decode, preprocess, infer, postprocess. Shared by every front end.
#[derive(Clone)]
pub struct ScoringPipeline {
    model: Arc<ModelCell>,
}

impl ScoringPipeline {
    pub fn new(model: Arc<ModelCell>) -> Self {
        Self { model }
    }

    pub fn score(&self, image: &[u8]) -> Result<FreshnessReport, ScoringError> {
        let pixels = decoder::decode(image)?;
        self.score_pixels(&pixels)
    }

    pub fn score_pixels(&self, pixels: &PixelArray) -> Result<FreshnessReport, ScoringError> {
        let batch = preprocess::preprocess(pixels)?;
        let outputs = self.model.infer(&batch)?;
        let percentage = postprocess::freshness_percentage(&outputs)?;

        log::debug!(
            "Scored {}x{} image: outputs {:?} -> {}%",
            pixels.width(),
            pixels.height(),
            outputs,
            percentage
        );
        Ok(FreshnessReport::from_percentage(percentage))
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.model.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::{CountingLoader, encode};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::sync::atomic::Ordering;

    fn pipeline_with(scores: Vec<f32>) -> (ScoringPipeline, CountingLoader, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pt");
        std::fs::write(&path, b"ok").unwrap();
        let loader = CountingLoader::with_scores(scores);
        let cell = ModelCell::new(path, loader.clone());
        (ScoringPipeline::new(Arc::new(cell)), loader, dir)
    }

    fn white_png(size: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn white_image_end_to_end() {
        let (pipeline, loader, _dir) = pipeline_with(vec![2.0, 0.0]);
        let report = pipeline.score(&white_png(64)).unwrap();

        assert_eq!(report.freshness_percentage, 88);
        assert_eq!(report.freshness_label, FreshnessLabel::Good);
        assert_eq!(
            report.freshness_label.to_string(),
            "It is good, you can still enjoy it."
        );
        assert_eq!(report.price, 8800);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(pipeline.model_info().is_some());
    }

    #[test]
    fn rotten_is_a_score_not_an_error() {
        let (pipeline, _, _dir) = pipeline_with(vec![-50.0, 50.0]);
        let report = pipeline.score(&white_png(8)).unwrap();
        assert_eq!(report.freshness_percentage, 0);
        assert_eq!(report.freshness_label, FreshnessLabel::Rotten);
        assert_eq!(report.price, 0);
    }

    #[test]
    fn errors_surface_by_stage() {
        let (pipeline, loader, _dir) = pipeline_with(vec![1.0, 0.0]);

        assert!(matches!(pipeline.score(b"\x89PNG broken"), Err(ScoringError::Decode(_))));

        let gray = GrayImage::from_pixel(8, 8, Luma([200]));
        let bytes = encode(DynamicImage::ImageLuma8(gray), ImageFormat::Png);
        assert!(matches!(
            pipeline.score(&bytes),
            Err(ScoringError::InvalidImageShape(_))
        ));

        // Neither failure reached the model.
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_model_is_reported_not_scored() {
        let dir = tempfile::tempdir().unwrap();
        let cell = ModelCell::new(dir.path().join("absent.pt"), CountingLoader::with_scores(vec![]));
        let pipeline = ScoringPipeline::new(Arc::new(cell));

        let err = pipeline.score(&white_png(16)).unwrap_err();
        assert!(matches!(err, ScoringError::ModelNotFound { .. }));
        assert_eq!(err.error_code(), "MODEL_NOT_FOUND");
    }
}
