#![allow(dead_code)]

use image::{ImageBuffer, ImageOutputFormat, Rgb};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use vision_service::inference::{preprocess, Classifier, InferenceError, InputLayout, Prediction};

pub const BOUNDARY: &str = "vision-test-boundary";

/// One part of a hand-built multipart body
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl Part {
    pub fn file(name: &str, filename: &str, bytes: &[u8]) -> Self {
        Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some("image/jpeg".into()),
            bytes: bytes.to_vec(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Part {
            name: name.into(),
            filename: None,
            content_type: None,
            bytes: value.as_bytes().to_vec(),
        }
    }
}

/// Encode `parts` as `multipart/form-data`, returning the content type header
/// value and the body
pub fn multipart(parts: &[Part]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = &part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Encode a solid-color RGB image as PNG
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb(color));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .unwrap();
    out
}

/// Always predicts the same class, counting how often it was asked
#[derive(Debug)]
pub struct FixedClassifier {
    class: i64,
    probability: Option<f32>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(class: i64, probability: Option<f32>) -> Self {
        FixedClassifier {
            class,
            probability,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _image: &[u8]) -> Result<Prediction, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Prediction {
            class: self.class,
            probability: self.probability,
        })
    }
}

/// Runs the real preprocessing, then calls anything brighter than mid-gray a 1
#[derive(Debug)]
pub struct DecodingClassifier;

impl Classifier for DecodingClassifier {
    fn classify(&self, image: &[u8]) -> Result<Prediction, InferenceError> {
        let pixels = preprocess(image, 28, InputLayout::Flat)?;
        let mean = pixels.data.iter().sum::<f32>() / pixels.data.len() as f32;
        Ok(Prediction {
            class: i64::from(mean > 0.5),
            probability: None,
        })
    }
}

#[derive(Debug)]
pub struct BrokenModel;

impl Classifier for BrokenModel {
    fn classify(&self, _image: &[u8]) -> Result<Prediction, InferenceError> {
        Err(InferenceError::Model("weights are corrupt".into()))
    }
}
