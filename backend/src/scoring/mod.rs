pub mod decoder;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
#[cfg(test)]
pub(crate) mod test_support;
#[cfg(feature = "torch")]
pub mod torch;

pub use decoder::{ChannelOrder, PixelArray, decode};
pub use model::{FreshnessModel, ModelCell, ModelInfo, ModelLoader, RawOutputs};
pub use pipeline::{FreshnessReport, ScoringPipeline};
pub use preprocess::{Batch, NormalizedTensor};
