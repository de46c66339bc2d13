//! The user-facing HTTP routes. `/predict` dispatches on the declared content
//! type: JSON bodies are validated, multipart uploads are classified.

use super::form::Form;
use super::protocol::{
    Health, PredictJsonRequest, PredictResponse, Probe, UploadResponse, UploadedImage,
};
use super::{AppState, WebError};
use crate::config::{JsonPolicy, IMAGE_FIELD, UPLOAD_FILE_NAME};
use actix_web::http::header::{ContentType, CONTENT_TYPE};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, WebError>;

const PREDICT_PAGE: &str = include_str!("predict_digit.html");

const NO_SIGNAL: &str = "Provide either 'image_url' or non-empty 'data'.";

/// Register every route on an actix `App`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz)
        .service(livez)
        .service(readyz)
        .service(predict)
        .service(predict_json_strict)
        .service(predict_digit_form)
        .service(predict_digit)
        .service(upload);
}

/// The two request encodings `/predict` understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Multipart,
}

impl Encoding {
    /// Pick an encoding from a raw `Content-Type` value, ignoring case and
    /// parameters such as `charset` or `boundary`
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.starts_with("application/json") {
            Ok(Encoding::Json)
        } else if content_type.starts_with("multipart/form-data") {
            Ok(Encoding::Multipart)
        } else {
            Err(WebError::UnsupportedMediaType)
        }
    }

    fn of(req: &HttpRequest) -> Result<Self> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self::from_content_type(content_type)
    }
}

#[get("/healthz")]
pub async fn healthz() -> impl Responder {
    web::Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[get("/livez")]
pub async fn livez() -> impl Responder {
    web::Json(Probe { status: "alive" })
}

/// The model is loaded before the server binds, so serving implies ready
#[get("/readyz")]
pub async fn readyz() -> impl Responder {
    web::Json(Probe { status: "ready" })
}

/// Predict from either a JSON body or a multipart `image` upload
#[post("/predict")]
pub async fn predict(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let response = match Encoding::of(&req)? {
        Encoding::Json => predict_json(payload, &state).await?,
        Encoding::Multipart => {
            let image = read_image(&req, payload, &state).await?;
            predict_image(image, &state).await?
        }
    };

    Ok(web::Json(response))
}

/// JSON-only prediction that always rejects bodies without a signal,
/// whatever `json_policy` says
#[post("/predict-json")]
pub async fn predict_json_strict(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    if Encoding::of(&req)? != Encoding::Json {
        return Err(WebError::UnsupportedMediaType);
    }
    let request = read_json(payload, &state).await?;
    if !request.has_signal() {
        return Err(WebError::Validation(NO_SIGNAL.into()));
    }
    Ok(web::Json(PredictResponse::json_validated()))
}

#[get("/predict_digit")]
pub async fn predict_digit_form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(PREDICT_PAGE)
}

/// Classify an upload posted from the `/predict_digit` form
#[post("/predict_digit")]
pub async fn predict_digit(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    if Encoding::of(&req)? != Encoding::Multipart {
        return Err(WebError::UnsupportedMediaType);
    }
    let image = read_image(&req, payload, &state).await?;
    Ok(web::Json(predict_image(image, &state).await?))
}

/// Persist the uploaded `image` under the upload directory
#[post("/upload")]
pub async fn upload(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    if Encoding::of(&req)? != Encoding::Multipart {
        return Err(WebError::UnsupportedMediaType);
    }
    let image = read_image(&req, payload, &state).await?;

    let dir = &state.settings.upload_dir;
    tokio::fs::create_dir_all(dir).await?;
    let dest = dir.join(UPLOAD_FILE_NAME);
    tokio::fs::write(&dest, &image.bytes).await?;
    let bytes = tokio::fs::metadata(&dest).await?.len();

    info!("saved upload to {} ({bytes} bytes)", dest.display());
    Ok(web::Json(UploadResponse {
        saved_as: dest.display().to_string(),
        original_name: image.filename.unwrap_or_default(),
        bytes,
        content_type: image.content_type.unwrap_or_default(),
    }))
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(WebError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn read_json(payload: web::Payload, state: &AppState) -> Result<PredictJsonRequest> {
    let body = read_body(payload, state.settings.payload_limit).await?;
    serde_json::from_slice(&body)
        .map_err(|e| WebError::Validation(format!("invalid JSON body: {e}")))
}

async fn predict_json(payload: web::Payload, state: &AppState) -> Result<PredictResponse> {
    let request = read_json(payload, state).await?;

    let has_signal = request.has_signal();
    if !has_signal && state.settings.json_policy == JsonPolicy::Strict {
        return Err(WebError::Validation(NO_SIGNAL.into()));
    }

    debug!("json request accepted (signal = {has_signal})");
    Ok(PredictResponse::json(has_signal))
}

async fn read_image(
    req: &HttpRequest,
    payload: web::Payload,
    state: &AppState,
) -> Result<UploadedImage> {
    let mut form = Form::read(req.headers(), payload, state.settings.payload_limit).await?;
    form.take_file(IMAGE_FIELD)
}

/// Classify non-empty uploads when a model is wired; otherwise only report
/// whether any bytes arrived
async fn predict_image(image: UploadedImage, state: &AppState) -> Result<PredictResponse> {
    if image.bytes.is_empty() {
        return Ok(PredictResponse::image(false, None));
    }

    let prediction = match state.classifier.clone() {
        Some(classifier) => {
            let bytes = image.bytes;
            let prediction = web::block(move || classifier.classify(&bytes)).await??;
            info!(
                "classified {:?} as {} (p = {:?})",
                image.filename.unwrap_or_default(),
                prediction.class,
                prediction.probability
            );
            Some(prediction)
        }
        None => None,
    };

    Ok(PredictResponse::image(true, prediction))
}
