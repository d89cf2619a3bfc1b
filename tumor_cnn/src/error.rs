use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Weights file not found: {0:?}")]
    WeightsNotFound(PathBuf),
    #[error("Unsupported weights format: {0:?}")]
    UnsupportedWeightsFormat(PathBuf),
    #[error("Input shape mismatch: expected per-sample shape {expected:?}, got {got:?}")]
    InputShape {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Unexpected output shape: {0:?}")]
    OutputShape(Vec<usize>),
    #[error("Image decoding failed: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Image read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("Tensor layout error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_shape_message() {
        let error = ModelError::InputShape {
            expected: vec![3, 128, 128],
            got: vec![1, 3, 64, 64],
        };
        assert_eq!(
            error.to_string(),
            "Input shape mismatch: expected per-sample shape [3, 128, 128], got [1, 3, 64, 64]"
        );
    }

    #[test]
    fn test_image_error_conversion() {
        let image_error =
            image::ImageError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad"));
        match ModelError::from(image_error) {
            ModelError::ImageDecode(_) => {}
            other => panic!("Expected ImageDecode, got {:?}", other),
        }
    }
}
