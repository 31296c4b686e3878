pub mod config;
pub mod error;
pub mod preview;
pub mod routes;
pub mod scoring;

pub use config::AppConfig;
pub use error::{ConfigError, ScoringError};
pub use scoring::{FreshnessReport, ModelCell, ScoringPipeline};
