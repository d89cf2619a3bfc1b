use tumor_cnn::{Diagnosis, ModelError};

/// Classifies one uploaded image. Implementations are shared read-only across
/// requests and may be called from several blocking threads at once.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, image_data: &[u8]) -> Result<Diagnosis, ModelError>;
}
