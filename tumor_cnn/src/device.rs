use crate::error::ModelError;
use candle_core::Device;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA when the crate is built with it and a device is present, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

pub fn select_device(preference: DevicePreference) -> Result<Device, ModelError> {
    let device = match preference {
        DevicePreference::Auto => Device::cuda_if_available(0)?,
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => Device::new_cuda(0)?,
    };

    tracing::info!("Selected {:?} device for inference", device);
    Ok(device)
}
