use crate::{architecture::NUM_CLASSES, error::ModelError};
use candle_core::Tensor;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Diagnosis {
    #[serde(rename = "No Tumor")]
    NoTumor,
    Tumor,
}

impl Diagnosis {
    const TUMOR_CLASS: usize = 1;

    pub fn from_class_index(index: usize) -> Self {
        if index == Self::TUMOR_CLASS {
            Diagnosis::Tumor
        } else {
            Diagnosis::NoTumor
        }
    }

    /// One diagnosis per row of a `(batch, 2)` logits tensor.
    ///
    /// The first maximum wins, so a tie between both scores reads as `NoTumor`.
    pub fn from_logits(logits: &Tensor) -> Result<Vec<Self>, ModelError> {
        let dims = logits.dims();
        if dims.len() != 2 || dims[1] != NUM_CLASSES {
            return Err(ModelError::OutputShape(dims.to_vec()));
        }

        let diagnoses = logits
            .to_vec2::<f32>()?
            .iter()
            .map(|scores| Self::from_class_index(argmax(scores)))
            .collect();

        Ok(diagnoses)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::NoTumor => "No Tumor",
            Diagnosis::Tumor => "Tumor",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (index, &score)| {
            if score > best.1 {
                (index, score)
            } else {
                best
            }
        })
        .0
}
