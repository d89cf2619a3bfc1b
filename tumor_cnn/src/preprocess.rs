use crate::{
    architecture::{IMAGE_SIZE, IN_CHANNELS},
    error::ModelError,
};
use candle_core::{Device, Tensor};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array, Ix4};

/// Evaluation-time image transform: decode, force RGB, resize, scale to [0, 1]
/// and normalize each channel with `(x - mean) / std`.
///
/// No random augmentation is applied, so the same bytes always map to the same tensor.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            size: IMAGE_SIZE as u32,
            mean: [0.5; 3],
            std: [0.5; 3],
        }
    }
}

impl ImageTransform {
    pub fn new(size: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { size, mean, std }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decodes raw image bytes into a `(1, 3, size, size)` array.
    pub fn apply(&self, image_data: &[u8]) -> Result<Array<f32, Ix4>, ModelError> {
        let image = image::ImageReader::new(std::io::Cursor::new(image_data))
            .with_guessed_format()?
            .decode()?;

        Ok(self.transform_image(&image))
    }

    pub fn transform_image(&self, image: &DynamicImage) -> Array<f32, Ix4> {
        let size = self.size as usize;
        let resized = image
            .resize_exact(self.size, self.size, FilterType::Triangle)
            .to_rgb8();

        let mut input = Array::zeros((1, IN_CHANNELS, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (channel, value) in pixel.0.iter().enumerate() {
                let scaled = *value as f32 / 255.;
                input[[0, channel, y, x]] = (scaled - self.mean[channel]) / self.std[channel];
            }
        }

        input
    }

    pub fn to_tensor(&self, input: Array<f32, Ix4>, device: &Device) -> Result<Tensor, ModelError> {
        let shape = input.dim();
        let input = input.as_standard_layout().into_owned();
        let (data, _) = input.into_raw_vec_and_offset();

        Ok(Tensor::from_vec(data, shape, device)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn png_from_pixel(width: u32, height: u32, pixel: Rgb<u8>) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, pixel);
        encode(DynamicImage::ImageRgb8(img), image::ImageFormat::Png)
    }

    #[test]
    fn test_output_shape() {
        let transform = ImageTransform::default();
        let input = transform.apply(&png_from_pixel(100, 100, Rgb([255, 0, 0]))).unwrap();

        assert_eq!(input.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_non_square_input_is_resized_exactly() {
        let transform = ImageTransform::default();
        let input = transform.apply(&png_from_pixel(300, 40, Rgb([0, 0, 0]))).unwrap();

        assert_eq!(input.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_normalization_range() {
        let transform = ImageTransform::default();

        let white = transform.apply(&png_from_pixel(10, 10, Rgb([255, 255, 255]))).unwrap();
        assert!(white.iter().all(|v| (v - 1.0).abs() < 1e-2));

        let black = transform.apply(&png_from_pixel(10, 10, Rgb([0, 0, 0]))).unwrap();
        assert!(black.iter().all(|v| (v + 1.0).abs() < 1e-2));
    }

    #[test]
    fn test_channel_first_layout() {
        let transform = ImageTransform::default();
        let input = transform.apply(&png_from_pixel(8, 8, Rgb([255, 0, 0]))).unwrap();

        assert!((input[[0, 0, 5, 7]] - 1.0).abs() < 1e-2);
        assert!((input[[0, 1, 5, 7]] + 1.0).abs() < 1e-2);
        assert!((input[[0, 2, 5, 7]] + 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_grayscale_and_alpha_inputs_become_three_channels() {
        let transform = ImageTransform::default();

        let gray = GrayImage::from_pixel(20, 20, Luma([128]));
        let input = transform
            .apply(&encode(DynamicImage::ImageLuma8(gray), image::ImageFormat::Png))
            .unwrap();
        assert_eq!(input.shape(), &[1, 3, 128, 128]);
        let expected = (128.0 / 255.0 - 0.5) / 0.5;
        assert!((input[[0, 2, 0, 0]] - expected).abs() < 1e-2);

        let rgba = ImageBuffer::from_pixel(20, 20, Rgba([10u8, 20, 30, 40]));
        let input = transform
            .apply(&encode(DynamicImage::ImageRgba8(rgba), image::ImageFormat::Png))
            .unwrap();
        assert_eq!(input.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_other_formats_decode() {
        let transform = ImageTransform::default();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([40, 80, 120])));

        for format in [image::ImageFormat::Jpeg, image::ImageFormat::Bmp] {
            let input = transform.apply(&encode(img.clone(), format)).unwrap();
            assert_eq!(input.shape(), &[1, 3, 128, 128]);
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let transform = ImageTransform::default();
        let mut img = RgbImage::new(64, 48);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) * 2) as u8]);
        }
        let bytes = encode(DynamicImage::ImageRgb8(img), image::ImageFormat::Png);

        assert_eq!(transform.apply(&bytes).unwrap(), transform.apply(&bytes).unwrap());
    }

    #[test]
    fn test_invalid_bytes() {
        let transform = ImageTransform::default();
        let result = transform.apply(b"definitely not an image");

        assert!(matches!(result, Err(ModelError::ImageDecode(_))));
    }

    #[test]
    fn test_to_tensor() {
        let transform = ImageTransform::default();
        let input = transform.apply(&png_from_pixel(16, 16, Rgb([255, 255, 255]))).unwrap();
        let tensor = transform.to_tensor(input, &Device::Cpu).unwrap();

        assert_eq!(tensor.dims(), &[1, 3, 128, 128]);
        let max = tensor.flatten_all().unwrap().max(0).unwrap().to_scalar::<f32>().unwrap();
        assert!((max - 1.0).abs() < 1e-2);
    }
}
