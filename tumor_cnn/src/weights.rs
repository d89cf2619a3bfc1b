use crate::{error::ModelError, network::TumorCnn};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightsFormat {
    /// PyTorch pickled state dict (`torch.save(model.state_dict())`).
    Pth,
    Safetensors,
}

impl WeightsFormat {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("pth") | Some("pt") => Ok(WeightsFormat::Pth),
            Some("safetensors") => Ok(WeightsFormat::Safetensors),
            _ => Err(ModelError::UnsupportedWeightsFormat(path.to_path_buf())),
        }
    }
}

/// Builds the network and restores its parameters from `weights_path`.
pub fn load_network(weights_path: impl AsRef<Path>, device: &Device) -> Result<TumorCnn, ModelError> {
    let path = weights_path.as_ref();
    if !path.exists() {
        return Err(ModelError::WeightsNotFound(path.to_path_buf()));
    }

    let format = WeightsFormat::from_path(path)?;
    let vb = match format {
        WeightsFormat::Pth => VarBuilder::from_pth(path, DType::F32, device)?,
        // SAFETY: the weights file is not modified while the service holds the mapping.
        WeightsFormat::Safetensors => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)?
        },
    };

    let network = TumorCnn::new(vb)?;
    tracing::info!("Loaded {:?} weights from {}", format, path.display());

    Ok(network)
}
