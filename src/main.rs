use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use chili_disease_service::config::{Config, INPUT_OPERATION, OUTPUT_OPERATION};
use chili_disease_service::model::{Classifier, TfModel};
use chili_disease_service::routes::{create_app, AppState};
use chili_disease_service::utils::ensure_model_exists;

async fn load_classifier(config: &Config) -> Option<Arc<dyn Classifier>> {
    info!("Checking model...");
    match ensure_model_exists(
        &config.model_path,
        config.model_url.as_deref(),
        config.github_token.as_deref(),
    )
    .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                "Model file {} not found and MODEL_URL is not set",
                config.model_path
            );
            return None;
        }
        Err(e) => {
            error!("Error downloading model: {}", e);
            return None;
        }
    }

    match TfModel::load(&config.model_path, INPUT_OPERATION, OUTPUT_OPERATION) {
        Ok(model) => {
            info!("MobileNetV2 model loaded successfully");
            let classifier: Arc<dyn Classifier> = Arc::new(model);
            Some(classifier)
        }
        Err(e) => {
            error!("Error loading model: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let classifier = load_classifier(&config).await;
    if classifier.is_none() {
        warn!("Serving without a model; /predict will report \"Model not loaded\"");
    }

    let app = create_app(AppState::new(classifier), config.body_limit_bytes);

    let address = config.bind_address();
    let addr: SocketAddr = address
        .parse()
        .with_context(|| format!("invalid bind address {}", address))?;

    info!("Listening on http://{}", address);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
