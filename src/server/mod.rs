use crate::config::Settings;
use crate::inference::{Classifier, InferenceError};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod form;
pub mod protocol;
pub mod routes;

/// Read-only state shared by every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,

    /// `None` when no model is configured
    pub classifier: Option<Arc<dyn Classifier>>,
}

impl AppState {
    pub fn new(settings: Settings, classifier: Option<Arc<dyn Classifier>>) -> Self {
        AppState {
            settings,
            classifier,
        }
    }
}

/// Every way a request can fail, each mapped to one status code
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Unsupported Media Type. Use application/json or multipart/form-data.")]
    UnsupportedMediaType,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("payload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed ({status}): {self}");
        } else {
            tracing::warn!("request rejected ({status}): {self}");
        }

        let err = HashMap::from([("errors", vec![self.to_string()])]);
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .json(err)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WebError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            WebError::Inference(_) | WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<actix_web::error::PayloadError> for WebError {
    fn from(err: actix_web::error::PayloadError) -> Self {
        WebError::BadRequest(format!("failed to read request body: {err}"))
    }
}

impl From<actix_multipart::MultipartError> for WebError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        WebError::BadRequest(format!("malformed multipart body: {err}"))
    }
}

impl From<actix_web::error::BlockingError> for WebError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        WebError::Internal(anyhow::anyhow!(err))
    }
}

impl From<std::io::Error> for WebError {
    fn from(err: std::io::Error) -> Self {
        WebError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebError::UnsupportedMediaType.status_code(), 415);
        assert_eq!(WebError::Validation("x".into()).status_code(), 422);
        assert_eq!(WebError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(WebError::PayloadTooLarge(1).status_code(), 413);
        assert_eq!(
            WebError::Inference(InferenceError::Model("boom".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_decode_error_maps_to_500() {
        let decode = image::load_from_memory(&[0, 1, 2]).unwrap_err();
        let err: WebError = InferenceError::from(decode).into();
        assert!(err.status_code().is_server_error());
        assert!(err.to_string().starts_with("could not decode image"));
    }
}
