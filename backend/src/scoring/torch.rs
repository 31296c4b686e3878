use std::io::Cursor;
use std::sync::Mutex;

use tch::{CModule, Device, Kind, Tensor};

use super::model::{FreshnessModel, ModelLoader, RawOutputs};
use super::preprocess::Batch;
use crate::config::ComputeDevice;
use crate::error::ScoringError;

/// Loads TorchScript exports of the freshness network.
pub struct TorchScriptLoader {
    device: Device,
}

impl TorchScriptLoader {
    pub fn new(device: ComputeDevice) -> Self {
        let device = match device {
            ComputeDevice::Cpu => Device::Cpu,
            ComputeDevice::Auto => Device::cuda_if_available(),
        };
        Self { device }
    }
}

impl ModelLoader for TorchScriptLoader {
    fn load(&self, weights: &[u8]) -> Result<Box<dyn FreshnessModel>, ScoringError> {
        log::info!("Loading TorchScript module on {:?}", self.device);
        let mut module = CModule::load_data_on_device(&mut Cursor::new(weights), self.device)
            .map_err(|e| ScoringError::Inference(format!("TorchScript load: {}", e)))?;
        module.set_eval();

        Ok(Box::new(TorchScriptModel {
            module: Mutex::new(module),
            device: self.device,
        }))
    }
}

// CModule is Send but not Sync.
pub struct TorchScriptModel {
    module: Mutex<CModule>,
    device: Device,
}

impl FreshnessModel for TorchScriptModel {
    fn forward(&self, batch: &Batch) -> Result<RawOutputs, ScoringError> {
        let shape: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
        let input = Tensor::f_from_slice(&batch.to_vec())
            .and_then(|t| t.f_view(shape.as_slice()))
            .map_err(|e| ScoringError::Inference(e.to_string()))?
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| ScoringError::Inference("model lock poisoned".to_string()))?;

        tch::no_grad(|| {
            let output = module
                .forward_ts(&[input])
                .map_err(|e| ScoringError::Inference(e.to_string()))?;
            let output_flat = output
                .to_device(Device::Cpu)
                .to_kind(Kind::Float)
                .f_view([-1])
                .map_err(|e| ScoringError::Inference(e.to_string()))?;
            Vec::<f32>::try_from(output_flat).map_err(|e| ScoringError::Inference(e.to_string()))
        })
    }
}
