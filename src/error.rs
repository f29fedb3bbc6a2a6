use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::InferenceError;
use crate::preprocess::PreprocessError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("No image file provided")]
    NoImageFile,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Failed to read upload: {0}")]
    Upload(#[from] MultipartError),
    #[error("An error occurred during prediction: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("An error occurred during prediction: {0}")]
    Inference(#[from] InferenceError),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::NoImageFile | PredictError::NoSelectedFile | PredictError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictError::ModelNotLoaded
            | PredictError::Preprocess(_)
            | PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
