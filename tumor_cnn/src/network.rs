use crate::{
    architecture::{LayerSpec, CLASSIFIER, FEATURES, IMAGE_SIZE, IN_CHANNELS},
    error::ModelError,
};
use candle_core::{Tensor, D};
use candle_nn::{BatchNormConfig, Conv2dConfig, ModuleT, VarBuilder};

/// A layer built from its [`LayerSpec`], holding the loaded parameters if it has any.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(candle_nn::Conv2d),
    Relu,
    BatchNorm2d(candle_nn::BatchNorm),
    MaxPool2d { kernel_size: usize, stride: usize },
    AdaptiveAvgPool2d,
    Flatten,
    Linear(candle_nn::Linear),
    Dropout(candle_nn::Dropout),
}

impl Layer {
    pub fn build(spec: &LayerSpec, vb: VarBuilder) -> candle_core::Result<Self> {
        let layer = match *spec {
            LayerSpec::Conv2d {
                in_channels,
                out_channels,
                kernel_size,
                padding,
            } => {
                let config = Conv2dConfig {
                    padding,
                    ..Default::default()
                };
                Layer::Conv2d(candle_nn::conv2d(
                    in_channels,
                    out_channels,
                    kernel_size,
                    config,
                    vb,
                )?)
            }
            LayerSpec::Relu => Layer::Relu,
            LayerSpec::BatchNorm2d { num_features } => Layer::BatchNorm2d(candle_nn::batch_norm(
                num_features,
                BatchNormConfig::default(),
                vb,
            )?),
            LayerSpec::MaxPool2d {
                kernel_size,
                stride,
            } => Layer::MaxPool2d {
                kernel_size,
                stride,
            },
            LayerSpec::AdaptiveAvgPool2d => Layer::AdaptiveAvgPool2d,
            LayerSpec::Flatten => Layer::Flatten,
            LayerSpec::Linear {
                in_features,
                out_features,
            } => Layer::Linear(candle_nn::linear(in_features, out_features, vb)?),
            LayerSpec::Dropout { p } => Layer::Dropout(candle_nn::Dropout::new(p)),
        };
        Ok(layer)
    }
}

impl ModuleT for Layer {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        match self {
            Layer::Conv2d(conv) => xs.apply(conv),
            Layer::Relu => xs.relu(),
            Layer::BatchNorm2d(norm) => norm.forward_t(xs, train),
            Layer::MaxPool2d {
                kernel_size,
                stride,
            } => xs.max_pool2d_with_stride(*kernel_size, *stride),
            Layer::AdaptiveAvgPool2d => xs.mean_keepdim(D::Minus1)?.mean_keepdim(D::Minus2),
            Layer::Flatten => xs.flatten_from(1),
            Layer::Linear(linear) => xs.apply(linear),
            Layer::Dropout(dropout) => dropout.forward_t(xs, train),
        }
    }
}

/// Convolutional tumor classifier: feature extractor followed by a
/// fully-connected head producing two logits (`No Tumor`, `Tumor`).
#[derive(Debug, Clone)]
pub struct TumorCnn {
    features: Vec<Layer>,
    classifier: Vec<Layer>,
}

fn build_stack(specs: &[LayerSpec], vb: VarBuilder) -> candle_core::Result<Vec<Layer>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| Layer::build(spec, vb.pp(index)))
        .collect()
}

impl TumorCnn {
    pub fn new(vb: VarBuilder) -> candle_core::Result<Self> {
        let features = build_stack(&FEATURES, vb.pp("features"))?;
        let classifier = build_stack(&CLASSIFIER, vb.pp("classifier"))?;

        Ok(Self {
            features,
            classifier,
        })
    }

    /// Inference-mode forward pass over a `(batch, 3, 128, 128)` tensor.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor, ModelError> {
        let dims = xs.dims();
        let expected = [IN_CHANNELS, IMAGE_SIZE, IMAGE_SIZE];
        if dims.len() != 4 || dims[1..] != expected {
            return Err(ModelError::InputShape {
                expected: expected.to_vec(),
                got: dims.to_vec(),
            });
        }

        Ok(self.forward_t(xs, false)?)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.features.iter().chain(self.classifier.iter())
    }
}

impl ModuleT for TumorCnn {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        self.layers()
            .try_fold(xs.clone(), |xs, layer| layer.forward_t(&xs, train))
    }
}
