mod error;

pub mod architecture;
pub mod device;
pub mod diagnosis;
pub mod network;
pub mod preprocess;
pub mod weights;

pub use architecture::{IMAGE_SIZE, IN_CHANNELS, NUM_CLASSES};
pub use device::{select_device, DevicePreference};
pub use diagnosis::Diagnosis;
pub use error::ModelError;
pub use network::TumorCnn;
pub use preprocess::ImageTransform;
pub use weights::load_network;
