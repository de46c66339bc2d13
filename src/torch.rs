//! Code for loading and running a trained TorchScript digit classifier

use crate::inference::{preprocess, Classifier, InferenceError, InputLayout, Prediction};
use anyhow::Result;
use tch::{no_grad, Kind, Tensor};
use tracing::{debug, info};

/// A loaded TorchScript model plus the input geometry it was exported with
#[derive(Debug)]
pub struct TorchModel {
    /// The loaded torch model
    model: tch::CModule,

    /// Side of the square grayscale input
    side: u32,

    layout: InputLayout,
}

impl TorchModel {
    pub fn new(filename: &str, side: u32, layout: InputLayout) -> Result<Self> {
        let mut model = tch::CModule::load(filename)?;
        model.set_eval();
        info!("loaded torchscript model {filename} (input {side}x{side}, {layout:?})");
        Ok(TorchModel {
            model,
            side,
            layout,
        })
    }
}

impl Classifier for TorchModel {
    fn classify(&self, image: &[u8]) -> Result<Prediction, InferenceError> {
        let pixels = preprocess(image, self.side, self.layout)?;
        let input = Tensor::from_slice(&pixels.data).reshape(pixels.shape.as_slice());

        let output = no_grad(|| self.model.forward_ts(&[input])).map_err(model_error)?;
        let prediction = top_class(&output)?;
        debug!(
            "classified image as {} (p = {:?})",
            prediction.class, prediction.probability
        );
        Ok(prediction)
    }
}

fn model_error(err: tch::TchError) -> InferenceError {
    InferenceError::Model(err.to_string())
}

/// Most likely class of a single-image output, either `[classes]` or
/// `[1, classes]` logits
fn top_class(logits: &Tensor) -> Result<Prediction, InferenceError> {
    let probs = logits.f_softmax(-1, Some(Kind::Float)).map_err(model_error)?;
    let class = probs
        .f_argmax(None::<i64>, false)
        .and_then(|t| t.f_int64_value(&[]))
        .map_err(model_error)?;
    let probability = probs
        .f_max()
        .and_then(|t| t.f_double_value(&[]))
        .map_err(model_error)?;

    Ok(Prediction {
        class,
        probability: Some(probability as f32),
    })
}
