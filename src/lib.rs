//! HTTP service that classifies chili leaf photos with a pre-trained MobileNetV2 graph.

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod routes;
pub mod utils;

pub use diagnosis::{Diagnosis, Severity};
pub use model::{Classifier, TfModel};
pub use routes::{create_app, AppState};
