//! Static layer layout of the tumor classifier.
//!
//! Layers are listed in execution order. A layer's position in its stack is
//! also the prefix of its parameters in the persisted state dict, so
//! `FEATURES[2]` owns `features.2.weight`, `features.2.running_mean`, etc.

pub const IMAGE_SIZE: usize = 128;
pub const IN_CHANNELS: usize = 3;
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerSpec {
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: usize,
    },
    Relu,
    BatchNorm2d {
        num_features: usize,
    },
    MaxPool2d {
        kernel_size: usize,
        stride: usize,
    },
    /// Global average pooling down to 1x1.
    AdaptiveAvgPool2d,
    Flatten,
    Linear {
        in_features: usize,
        out_features: usize,
    },
    Dropout {
        p: f32,
    },
}

const fn conv(in_channels: usize, out_channels: usize) -> LayerSpec {
    // kernel 3 with padding 1 keeps the spatial size ("same")
    LayerSpec::Conv2d {
        in_channels,
        out_channels,
        kernel_size: 3,
        padding: 1,
    }
}

const fn batch_norm(num_features: usize) -> LayerSpec {
    LayerSpec::BatchNorm2d { num_features }
}

const fn max_pool(stride: usize) -> LayerSpec {
    LayerSpec::MaxPool2d {
        kernel_size: 3,
        stride,
    }
}

const fn linear(in_features: usize, out_features: usize) -> LayerSpec {
    LayerSpec::Linear {
        in_features,
        out_features,
    }
}

const DROPOUT: LayerSpec = LayerSpec::Dropout { p: 0.5 };

pub const FEATURES: [LayerSpec; 16] = [
    conv(IN_CHANNELS, 32),
    LayerSpec::Relu,
    batch_norm(32),
    max_pool(2),
    conv(32, 64),
    LayerSpec::Relu,
    batch_norm(64),
    max_pool(2),
    conv(64, 128),
    LayerSpec::Relu,
    batch_norm(128),
    max_pool(3),
    conv(128, 256),
    LayerSpec::Relu,
    batch_norm(256),
    max_pool(3),
];

pub const CLASSIFIER: [LayerSpec; 9] = [
    LayerSpec::AdaptiveAvgPool2d,
    LayerSpec::Flatten,
    linear(256, 64),
    LayerSpec::Relu,
    DROPOUT,
    linear(64, 32),
    LayerSpec::Relu,
    DROPOUT,
    linear(32, NUM_CLASSES),
];

/// Spatial size after the feature extractor for a square input of `size`.
pub fn feature_map_size(size: usize) -> usize {
    FEATURES.iter().fold(size, |size, spec| match *spec {
        LayerSpec::Conv2d {
            kernel_size,
            padding,
            ..
        } => size + 2 * padding - kernel_size + 1,
        LayerSpec::MaxPool2d {
            kernel_size,
            stride,
        } => (size - kernel_size) / stride + 1,
        _ => size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_stages_double_channels() {
        let channels: Vec<(usize, usize)> = FEATURES
            .iter()
            .filter_map(|spec| match spec {
                LayerSpec::Conv2d {
                    in_channels,
                    out_channels,
                    ..
                } => Some((*in_channels, *out_channels)),
                _ => None,
            })
            .collect();

        assert_eq!(channels, vec![(3, 32), (32, 64), (64, 128), (128, 256)]);
    }

    #[test]
    fn test_each_stage_is_conv_relu_norm_pool() {
        for stage in FEATURES.chunks(4) {
            assert!(matches!(stage[0], LayerSpec::Conv2d { .. }));
            assert_eq!(stage[1], LayerSpec::Relu);
            assert!(matches!(stage[2], LayerSpec::BatchNorm2d { .. }));
            assert!(matches!(stage[3], LayerSpec::MaxPool2d { .. }));
        }
    }

    #[test]
    fn test_classifier_head_dimensions() {
        let dims: Vec<(usize, usize)> = CLASSIFIER
            .iter()
            .filter_map(|spec| match spec {
                LayerSpec::Linear {
                    in_features,
                    out_features,
                } => Some((*in_features, *out_features)),
                _ => None,
            })
            .collect();

        assert_eq!(dims, vec![(256, 64), (64, 32), (32, 2)]);
    }

    #[test]
    fn test_feature_map_size() {
        // 128 -> 63 -> 31 -> 10 -> 3
        assert_eq!(feature_map_size(IMAGE_SIZE), 3);
    }
}
