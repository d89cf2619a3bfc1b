use crate::{config::ModelConfig, model_service::ModelService};
use candle_core::{Device, Tensor};
use tumor_cnn::{load_network, select_device, Diagnosis, ImageTransform, ModelError, TumorCnn};

/// Runs the tumor classifier with candle. Built once at startup; the network
/// and device are never mutated afterwards.
pub struct CandleModelService {
    network: TumorCnn,
    transform: ImageTransform,
    device: Device,
}

impl CandleModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelError> {
        let device = select_device(model_config.device)?;
        let network = load_network(model_config.get_path(), &device)?;

        tracing::info!(
            "Tumor classifier ready with weights {:?}",
            model_config.get_path()
        );

        Ok(Self::from_network(network, device))
    }

    pub fn from_network(network: TumorCnn, device: Device) -> Self {
        Self {
            network,
            transform: ImageTransform::default(),
            device,
        }
    }

    pub fn run_inference(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        self.network.forward(input)
    }
}

impl ModelService for CandleModelService {
    fn predict(&self, image_data: &[u8]) -> Result<Diagnosis, ModelError> {
        let input = self.transform.apply(image_data)?;
        let input = self.transform.to_tensor(input, &self.device)?;

        let logits = self.run_inference(&input)?;
        tracing::debug!("Logits: {:?}", logits.to_vec2::<f32>()?);

        Diagnosis::from_logits(&logits)?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::OutputShape(logits.dims().to_vec()))
    }
}
