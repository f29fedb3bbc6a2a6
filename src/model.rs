use std::fs;
use std::path::Path;

use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};
use thiserror::Error;
use tracing::{debug, info};

use crate::preprocess::ImageTensor;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("tensorflow error: {0}")]
    Tensorflow(#[from] tensorflow::Status),
    #[error("operation '{0}' not found in graph")]
    MissingOperation(String),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Tensorflow(#[from] tensorflow::Status),
    #[error("operation '{0}' not found in graph")]
    MissingOperation(String),
    #[error("model returned an empty output")]
    EmptyOutput,
    #[error("model returned no usable scores")]
    NoUsableScores,
    #[error("model returned {actual} scores but {expected} class labels are configured")]
    LabelMismatch { expected: usize, actual: usize },
    #[error("inference worker failed: {0}")]
    Worker(String),
}

/// A loaded image classifier, shared read-only by every request.
pub trait Classifier: Send + Sync {
    /// Runs a forward pass and returns the per-class scores for the single batch entry.
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

/// Frozen TensorFlow graph with a single image input and a softmax output.
pub struct TfModel {
    session: Session,
    graph: Graph,
    input_operation: String,
    output_operation: String,
}

impl TfModel {
    pub fn load(
        model_path: impl AsRef<Path>,
        input_operation: &str,
        output_operation: &str,
    ) -> Result<Self, ModelLoadError> {
        let model_path = model_path.as_ref();
        let model_bytes = fs::read(model_path).map_err(|source| ModelLoadError::Io {
            path: model_path.display().to_string(),
            source,
        })?;

        let mut graph = Graph::new();
        graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

        for name in [input_operation, output_operation] {
            if graph.operation_by_name(name).map_err(tensorflow::Status::from)?.is_none() {
                return Err(ModelLoadError::MissingOperation(name.to_string()));
            }
        }

        let session = Session::new(&SessionOptions::new(), &graph)?;
        info!(
            "Loaded model from {} ({} bytes)",
            model_path.display(),
            model_bytes.len()
        );

        Ok(TfModel {
            session,
            graph,
            input_operation: input_operation.to_string(),
            output_operation: output_operation.to_string(),
        })
    }
}

impl Classifier for TfModel {
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let mut input_tensor = Tensor::new(&input.shape);
        input_tensor.copy_from_slice(&input.data);

        let input_op = self
            .graph
            .operation_by_name(&self.input_operation)
            .map_err(tensorflow::Status::from)?
            .ok_or_else(|| InferenceError::MissingOperation(self.input_operation.clone()))?;
        let output_op = self
            .graph
            .operation_by_name(&self.output_operation)
            .map_err(tensorflow::Status::from)?
            .ok_or_else(|| InferenceError::MissingOperation(self.output_operation.clone()))?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_op, 0, &input_tensor);
        let output_token = args.request_fetch(&output_op, 0);
        self.session.run(&mut args)?;

        let output: Tensor<f32> = args.fetch(output_token)?;
        let scores = output.to_vec();
        debug!("Model produced {} scores", scores.len());

        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(scores)
    }
}
