//! The inference adapter: the only seam between the HTTP front end and the
//! loaded model. Handlers see a `Classifier` and nothing else.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Failures a classifier can report for a single request
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The uploaded bytes are not a raster image
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The model is loaded but could not produce an output
    #[error("model failed: {0}")]
    Model(String),
}

/// A class prediction outputted by a classifier model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub class: i64,
    pub probability: Option<f32>,
}

/// Something that turns encoded image bytes into a class index.
///
/// Implementations are built once at startup and shared across request
/// handlers, so they must be safe to call concurrently.
pub trait Classifier: Send + Sync + Debug {
    fn classify(&self, image: &[u8]) -> Result<Prediction, InferenceError>;
}

/// Tensor layout the loaded model expects for a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// `[1, side * side]`, for MLPs
    #[default]
    Flat,

    /// `[1, 1, side, side]`, channels first
    Nchw,

    /// `[1, side, side, 1]`, channels last
    Nhwc,
}

impl InputLayout {
    pub fn shape(&self, side: u32) -> Vec<i64> {
        let side = side as i64;
        match self {
            InputLayout::Flat => vec![1, side * side],
            InputLayout::Nchw => vec![1, 1, side, side],
            InputLayout::Nhwc => vec![1, side, side, 1],
        }
    }
}

/// A preprocessed single-image batch, ready to be handed to a model
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels {
    pub data: Vec<f32>,
    pub shape: Vec<i64>,
}

/// Decode `bytes`, convert to grayscale, resize to `side x side` and scale
/// intensities into `[0, 1]`.
///
/// A single channel stored row-major reads the same in all three layouts, so
/// only the reported shape depends on `layout`.
pub fn preprocess(bytes: &[u8], side: u32, layout: InputLayout) -> Result<Pixels, InferenceError> {
    let image = image::load_from_memory(bytes)?;
    let gray = image
        .grayscale()
        .resize_exact(side, side, FilterType::CatmullRom)
        .to_luma8();

    let data = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    Ok(Pixels {
        data,
        shape: layout.shape(side),
    })
}
