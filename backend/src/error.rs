use std::path::PathBuf;

/// Failures surfaced by the scoring pipeline.
///
/// None of these is ever folded into a percentage: a failed score and a
/// rotten fruit must stay distinguishable for the caller.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Image decode error: {0}")]
    Decode(String),
    #[error("Invalid image shape: {0}")]
    InvalidImageShape(String),
    #[error("Model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },
    #[error("Failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("Inference error: {0}")]
    Inference(String),
}

impl ScoringError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ScoringError::Decode(_) => "DECODE_ERROR",
            ScoringError::InvalidImageShape(_) => "INVALID_IMAGE_SHAPE",
            ScoringError::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            ScoringError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
            ScoringError::Inference(_) => "INFERENCE_ERROR",
        }
    }
}

impl From<image::ImageError> for ScoringError {
    fn from(err: image::ImageError) -> Self {
        ScoringError::Decode(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
