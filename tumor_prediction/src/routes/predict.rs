use crate::{model_service::ModelService, server::SharedState};
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;
use tumor_cnn::Diagnosis;

const ROUTE: &str = "/predict";
const FILE_FIELD: &str = "file";
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No file uploaded")]
    NoFileUploaded,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Please upload a valid image file (PNG, JPG, JPEG, GIF, BMP)")]
    InvalidFileType,
    #[error("Empty file uploaded")]
    EmptyFile,
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Error processing image: {0}")]
    Processing(String),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictError::NoFileUploaded
            | PredictError::NoFileSelected
            | PredictError::InvalidFileType
            | PredictError::EmptyFile => StatusCode::BAD_REQUEST,
            PredictError::Multipart(e) => e.status(),
            PredictError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize, Debug)]
pub struct PredictResponse {
    pub prediction: Diagnosis,
    pub success: bool,
}

struct Upload {
    file_name: String,
    data: Bytes,
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    let file_name = file_name.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|extension| file_name.ends_with(&format!(".{}", extension)))
}

/// Pulls the first `file` part that carries a filename out of the form and
/// checks it in order: filename present, extension allowed, content non-empty.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, PredictError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // a `file` part without a filename is a plain form value, not an upload
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        if file_name.is_empty() {
            return Err(PredictError::NoFileSelected);
        }
        if !has_allowed_extension(&file_name) {
            return Err(PredictError::InvalidFileType);
        }

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(PredictError::EmptyFile);
        }

        return Ok(Upload { file_name, data });
    }

    Err(PredictError::NoFileUploaded)
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, PredictError> {
    state.metrics.record_request(ROUTE);

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Request is not a multipart upload: {}", rejection);
        PredictError::NoFileUploaded
    })?;
    let upload = read_upload(&mut multipart).await?;
    tracing::debug!(
        "Received {} ({} bytes)",
        upload.file_name,
        upload.data.len()
    );

    let start = Instant::now();
    let model_service = state.model_service.clone();
    let result = tokio::task::spawn_blocking(move || model_service.predict(&upload.data)).await;

    let diagnosis = match result {
        Ok(Ok(diagnosis)) => diagnosis,
        Ok(Err(e)) => {
            tracing::error!("Error during analysis: {}", e);
            return Err(PredictError::Processing(e.to_string()));
        }
        Err(e) => {
            tracing::error!("Inference task failed: {}", e);
            return Err(PredictError::Processing(e.to_string()));
        }
    };

    state
        .metrics
        .record_prediction_duration(start.elapsed().as_millis() as u64, ROUTE);
    state.metrics.record_prediction(diagnosis);
    tracing::info!("Prediction: {}", diagnosis);

    Ok(Json(PredictResponse {
        prediction: diagnosis,
        success: true,
    }))
}
