use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use super::preprocess::Batch;
use crate::error::ScoringError;

/// Number of scores the classifier emits: fresh, then not fresh.
pub const NUM_CLASSES: usize = 2;

/// Unnormalized class scores straight out of the network.
pub type RawOutputs = Vec<f32>;

/// A loaded classifier. Implementations must be deterministic and hold no
/// per-call mutable state.
pub trait FreshnessModel: Send + Sync {
    fn forward(&self, batch: &Batch) -> Result<RawOutputs, ScoringError>;
}

/// Turns the bytes of a weights file into a ready-to-run model.
pub trait ModelLoader: Send + Sync {
    fn load(&self, weights: &[u8]) -> Result<Box<dyn FreshnessModel>, ScoringError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

struct LoadedModel {
    model: Box<dyn FreshnessModel>,
    info: ModelInfo,
}

/// Owns the weights path and loads the model on first use.
///
/// Concurrent first callers block on a single load. A failed load is not
/// remembered, so the next call tries again.
pub struct ModelCell {
    path: PathBuf,
    loader: Box<dyn ModelLoader>,
    loaded: OnceCell<LoadedModel>,
}

impl ModelCell {
    pub fn new(path: impl Into<PathBuf>, loader: impl ModelLoader + 'static) -> Self {
        Self {
            path: path.into(),
            loader: Box::new(loader),
            loaded: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Metadata of the loaded model; never triggers a load.
    pub fn info(&self) -> Option<ModelInfo> {
        self.loaded.get().map(|loaded| loaded.info.clone())
    }

    pub fn preload(&self) -> Result<ModelInfo, ScoringError> {
        self.get_or_load().map(|loaded| loaded.info.clone())
    }

    pub fn infer(&self, batch: &Batch) -> Result<RawOutputs, ScoringError> {
        let loaded = self.get_or_load()?;
        let outputs = loaded.model.forward(batch)?;

        if outputs.len() != NUM_CLASSES {
            return Err(ScoringError::Inference(format!(
                "expected {} class scores, model returned {}",
                NUM_CLASSES,
                outputs.len()
            )));
        }
        if outputs.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::Inference(format!(
                "model returned non-finite scores: {:?}",
                outputs
            )));
        }
        Ok(outputs)
    }

    fn get_or_load(&self) -> Result<&LoadedModel, ScoringError> {
        self.loaded.get_or_try_init(|| {
            self.load().inspect_err(|e| {
                log::error!("Model load failed: {}", e);
            })
        })
    }

    fn load(&self) -> Result<LoadedModel, ScoringError> {
        let started = Instant::now();
        log::info!("Loading model from {}", self.path.display());

        let weights = std::fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScoringError::ModelNotFound {
                path: self.path.clone(),
            },
            _ => ScoringError::ModelLoad {
                path: self.path.clone(),
                reason: e.to_string(),
            },
        })?;

        let fingerprint = hex::encode(Sha256::digest(&weights));
        let model = self.loader.load(&weights).map_err(|e| match e {
            ScoringError::ModelLoad { .. } => e,
            other => ScoringError::ModelLoad {
                path: self.path.clone(),
                reason: other.to_string(),
            },
        })?;

        log::info!(
            "Model loaded in {:?} (sha256 {})",
            started.elapsed(),
            fingerprint
        );

        Ok(LoadedModel {
            model,
            info: ModelInfo {
                fingerprint,
                loaded_at: Utc::now(),
            },
        })
    }
}
