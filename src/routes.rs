use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::config::{CLASS_NAMES, IMAGE_DIMENSIONS};
use crate::diagnosis::Diagnosis;
use crate::error::PredictError;
use crate::model::{Classifier, InferenceError};
use crate::preprocess::preprocess_image;

/// Multipart field carrying the uploaded leaf photo.
pub const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    /// `None` when the model failed to load at startup.
    pub classifier: Option<Arc<dyn Classifier>>,
    pub labels: Arc<Vec<String>>,
    /// (height, width) fed to the classifier.
    pub image_size: (u32, u32),
}

impl AppState {
    pub fn new(classifier: Option<Arc<dyn Classifier>>) -> Self {
        AppState {
            classifier,
            labels: Arc::new(CLASS_NAMES.iter().map(|s| s.to_string()).collect()),
            image_size: (IMAGE_DIMENSIONS.0, IMAGE_DIMENSIONS.1),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }
}

pub fn create_app(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Finds the first `image` part that is a file. Parts without a filename are plain form values.
async fn read_image_field(multipart: &mut Multipart) -> Result<Upload, PredictError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = match field.file_name() {
            None => continue,
            Some("") => return Err(PredictError::NoSelectedFile),
            Some(name) => name.to_string(),
        };
        let bytes = field.bytes().await?;
        return Ok(Upload { file_name, bytes });
    }
    Err(PredictError::NoImageFile)
}

async fn predict_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Diagnosis>, PredictError> {
    let classifier = state.classifier.clone().ok_or_else(|| {
        warn!("Prediction requested but no model is loaded");
        PredictError::ModelNotLoaded
    })?;

    let mut multipart = multipart.map_err(|rejection| {
        debug!("Request is not a multipart upload: {}", rejection);
        PredictError::NoImageFile
    })?;

    let upload = read_image_field(&mut multipart)
        .await
        .inspect_err(|e| warn!("Rejected upload: {}", e))?;
    debug!(
        "Received {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let image_size = state.image_size;
    let labels = state.labels.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Diagnosis, PredictError> {
        let input = preprocess_image(&upload.bytes, image_size)?;
        let scores = classifier.classify(&input)?;
        Ok(Diagnosis::from_probabilities(&scores, labels.as_slice())?)
    })
    .await
    .map_err(|e| PredictError::Inference(InferenceError::Worker(e.to_string())))?;

    match result {
        Ok(diagnosis) => {
            info!(
                "Predicted {} ({:.2}%, {:?})",
                diagnosis.disease, diagnosis.confidence, diagnosis.severity
            );
            Ok(Json(diagnosis))
        }
        Err(e @ PredictError::Preprocess(_)) => {
            warn!("Prediction error: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Prediction error: {}", e);
            Err(e)
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "OK", "model_loaded": state.model_loaded() }))
}
