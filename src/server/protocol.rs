use crate::config::{IMAGE_CONFIDENCE, JSON_CONFIDENCE};
use crate::inference::Prediction;
use serde::{Deserialize, Serialize};

/// JSON body accepted by `/predict`
#[derive(Debug, Default, Deserialize)]
pub struct PredictJsonRequest {
    pub image_url: Option<String>,
    pub data: Option<Vec<f64>>,
}

impl PredictJsonRequest {
    /// Whether the body carries something a model could work with: a
    /// non-empty URL or a non-empty vector
    pub fn has_signal(&self) -> bool {
        let has_url = self.image_url.as_deref().is_some_and(|u| !u.is_empty());
        let has_data = self.data.as_ref().is_some_and(|d| !d.is_empty());
        has_url || has_data
    }
}

/// Which request encoding produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Json,
    Image,
}

/// The single response shape of every prediction route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: String,
    pub confidence: f32,
    pub mode: Mode,

    /// Predicted class. Omitted unless a model ran or the route reports a
    /// placeholder class
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<i64>,
}

impl PredictResponse {
    pub fn json(has_signal: bool) -> Self {
        let label = if has_signal { "json_ok" } else { "json_empty" };
        Self::new(label, JSON_CONFIDENCE, Mode::Json, None)
    }

    /// Response of the strict JSON route, which reports a placeholder class
    pub fn json_validated() -> Self {
        Self::new("json_ok", JSON_CONFIDENCE, Mode::Json, Some(0))
    }

    pub fn image(has_bytes: bool, prediction: Option<Prediction>) -> Self {
        let label = if has_bytes { "image_ok" } else { "image_empty" };
        let confidence = prediction
            .and_then(|p| p.probability)
            .unwrap_or(IMAGE_CONFIDENCE);
        Self::new(label, confidence, Mode::Image, prediction.map(|p| p.class))
    }

    fn new(label: &str, confidence: f32, mode: Mode, result: Option<i64>) -> Self {
        PredictResponse {
            label: label.into(),
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
            mode,
            result,
        }
    }
}

/// An uploaded file, alive for the duration of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// A multipart form value. Parts with a `filename` in their
/// content-disposition are files, everything else is text.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    File(UploadedImage),
    Text(String),
}

/// Response of `/upload`
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub saved_as: String,
    pub original_name: String,
    pub bytes: u64,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Probe {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> PredictJsonRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_signal() {
        assert!(request(r#"{"data": [1.0, 2.0, 5]}"#).has_signal());
        assert!(request(r#"{"image_url": "https://example.com/cat.jpg"}"#).has_signal());
        assert!(!request("{}").has_signal());
        assert!(!request(r#"{"data": []}"#).has_signal());
        assert!(!request(r#"{"image_url": "", "data": null}"#).has_signal());
    }

    #[test]
    fn test_json_response() {
        let res = PredictResponse::json(true);
        assert_eq!(res.label, "json_ok");
        assert_eq!(res.mode, Mode::Json);
        assert_eq!(res.confidence, JSON_CONFIDENCE);

        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["mode"], "json");
        assert!(value.get("result").is_none());

        assert_eq!(PredictResponse::json(false).label, "json_empty");

        let validated = serde_json::to_value(PredictResponse::json_validated()).unwrap();
        assert_eq!(validated["label"], "json_ok");
        assert_eq!(validated["result"], 0);
    }

    #[test]
    fn test_image_response() {
        let empty = PredictResponse::image(false, None);
        assert_eq!(empty.label, "image_empty");
        assert_eq!(empty.confidence, IMAGE_CONFIDENCE);

        let prediction = Prediction {
            class: 7,
            probability: Some(0.91),
        };
        let res = PredictResponse::image(true, Some(prediction));
        assert_eq!(res.label, "image_ok");
        assert_eq!(res.result, Some(7));
        assert_eq!(res.confidence, 0.91);
        assert_eq!(serde_json::to_value(&res).unwrap()["result"], 7);
    }

    #[test]
    fn test_confidence_clamped() {
        let prediction = Prediction {
            class: 1,
            probability: Some(1.5),
        };
        assert_eq!(PredictResponse::image(true, Some(prediction)).confidence, 1.0);

        let prediction = Prediction {
            class: 1,
            probability: Some(f32::NAN),
        };
        assert_eq!(PredictResponse::image(true, Some(prediction)).confidence, 0.0);
    }
}
