use actix_multipart::Multipart;
use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use shared::{
    Base64ImageRequest, CheckoutResponse, ErrorResponse, HealthResponse, RecognizeResponse,
};
use uuid::Uuid;

use crate::error::ScoringError;
use crate::preview::{self, PreviewError};
use crate::scoring::{FreshnessReport, ScoringPipeline, decode};

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image provided")]
    MissingImage,
    #[error("Image too large: more than {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    #[error("Malformed JSON body: {0}")]
    InvalidJson(String),
    #[error("Invalid base64 image: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("Preview error: {0}")]
    Preview(String),
    #[error("Worker pool error: {0}")]
    Blocking(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "MISSING_IMAGE",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Multipart(_) => "MULTIPART_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Base64(_) => "BASE64_DECODE_ERROR",
            ApiError::Scoring(e) => e.error_code(),
            ApiError::Preview(_) => "PREVIEW_ERROR",
            ApiError::Blocking(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<PreviewError> for ApiError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::Pixels(e) => ApiError::Scoring(e),
            PreviewError::Encode(e) => ApiError::Preview(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage
            | ApiError::Multipart(_)
            | ApiError::InvalidJson(_)
            | ApiError::Base64(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Scoring(ScoringError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Scoring(ScoringError::InvalidImageShape(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Scoring(ScoringError::ModelNotFound { .. })
            | ApiError::Scoring(ScoringError::ModelLoad { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Scoring(ScoringError::Inference(_))
            | ApiError::Preview(_)
            | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        error!("Request failed ({}): {}", status, self);
        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limits: UploadLimits) {
    // base64 inflates payloads by a third, plus room for the JSON envelope.
    let json_limit = limits.max_bytes / 3 * 4 + 4096;
    let max_bytes = limits.max_bytes;
    let json_config = web::JsonConfig::default()
        .limit(json_limit)
        .error_handler(move |err, _req| json_error(err, max_bytes).into());

    cfg.app_data(web::Data::new(limits))
        .app_data(json_config)
        .service(web::resource("/api/recognize").route(web::post().to(handle_recognize)))
        .service(
            web::resource("/api/recognize/base64").route(web::post().to(handle_recognize_base64)),
        )
        .service(web::resource("/api/checkout").route(web::post().to(handle_checkout)))
        .service(web::resource("/api/health").route(web::get().to(handle_health)));
}

/// Keeps extractor failures on the JSON endpoint in the `ErrorResponse` shape.
fn json_error(err: JsonPayloadError, max_bytes: usize) -> ApiError {
    match err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            ApiError::PayloadTooLarge(max_bytes)
        }
        other => ApiError::InvalidJson(other.to_string()),
    }
}

async fn handle_recognize(
    pipeline: web::Data<ScoringPipeline>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let image = read_image_field(payload, limits.max_bytes).await?;
    let report = score_blocking(pipeline, image).await?;
    Ok(HttpResponse::Ok().json(recognize_response(report)))
}

async fn handle_recognize_base64(
    pipeline: web::Data<ScoringPipeline>,
    limits: web::Data<UploadLimits>,
    request: web::Json<Base64ImageRequest>,
) -> Result<HttpResponse, ApiError> {
    let image = decode_base64_image(&request.image_data)?;
    if image.len() > limits.max_bytes {
        return Err(ApiError::PayloadTooLarge(limits.max_bytes));
    }
    let report = score_blocking(pipeline, image).await?;
    Ok(HttpResponse::Ok().json(recognize_response(report)))
}

async fn handle_checkout(
    pipeline: web::Data<ScoringPipeline>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let image = read_image_field(payload, limits.max_bytes).await?;
    let pipeline = pipeline.into_inner();

    let (report, image_data_url) = web::block(move || {
        let pixels = decode(&image)?;
        let report = pipeline.score_pixels(&pixels)?;
        let preview = preview::jpeg_data_url(&pixels)?;
        Ok::<_, ApiError>((report, preview))
    })
    .await
    .map_err(|e| ApiError::Blocking(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CheckoutResponse {
        recognition: recognize_response(report),
        image_data_url,
    }))
}

async fn handle_health(pipeline: web::Data<ScoringPipeline>) -> HttpResponse {
    let info = pipeline.model_info();
    let status = if info.is_some() { "ok" } else { "model_unavailable" };
    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        model_loaded: info.is_some(),
        model_fingerprint: info.as_ref().map(|i| i.fingerprint.clone()),
        model_loaded_at: info.map(|i| i.loaded_at.to_rfc3339()),
    })
}

async fn score_blocking(
    pipeline: web::Data<ScoringPipeline>,
    image: Vec<u8>,
) -> Result<FreshnessReport, ApiError> {
    let pipeline = pipeline.into_inner();
    let report = web::block(move || pipeline.score(&image))
        .await
        .map_err(|e| ApiError::Blocking(e.to_string()))??;
    Ok(report)
}

fn recognize_response(report: FreshnessReport) -> RecognizeResponse {
    let request_id = Uuid::new_v4();
    info!(
        "Request {}: freshness {}% ({:?}), price {}",
        request_id, report.freshness_percentage, report.freshness_label, report.price
    );
    RecognizeResponse {
        request_id,
        freshness_percentage: report.freshness_percentage,
        freshness_label: report.freshness_label.to_string(),
        grade: report.freshness_label,
        price: report.price,
    }
}

/// Pulls the `image` file field out of a multipart body, enforcing the size
/// limit while streaming. Other fields are drained and ignored.
async fn read_image_field(mut payload: Multipart, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let mut image: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        let is_image = field.name() == Some(IMAGE_FIELD) && image.is_none();
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            if !is_image {
                continue;
            }
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge(max_bytes));
            }
            data.extend_from_slice(&chunk);
        }
        if is_image {
            image = Some(data);
        }
    }

    image.ok_or(ApiError::MissingImage)
}

/// Accepts plain base64 or a `data:image/...;base64,` URL.
fn decode_base64_image(data: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}
