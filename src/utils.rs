use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid GITHUB_TOKEN format")]
    InvalidToken,
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("failed to download {url}: HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

fn download_headers(token: Option<&str>) -> Result<HeaderMap, DownloadError> {
    let mut header_map = HeaderMap::new();
    if let Some(token) = token {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| DownloadError::InvalidToken)?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));
    Ok(header_map)
}

async fn download_file(url: &str, path: &Path, token: Option<&str>) -> Result<(), DownloadError> {
    info!("Downloading {} from {}", path.display(), url);

    let request_err = |source| DownloadError::Request {
        url: url.to_string(),
        source,
    };
    let response = reqwest::Client::new()
        .get(url)
        .headers(download_headers(token)?)
        .send()
        .await
        .map_err(request_err)?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let bytes = response.bytes().await.map_err(request_err)?;

    let write_err = |source| DownloadError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, &bytes).await.map_err(write_err)?;

    info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Fetches the model artifact when it is missing locally and a URL is configured.
/// Returns whether the file is present afterwards.
pub async fn ensure_model_exists(
    model_path: &str,
    model_url: Option<&str>,
    token: Option<&str>,
) -> Result<bool, DownloadError> {
    let path = Path::new(model_path);
    if path.exists() {
        return Ok(true);
    }

    match model_url {
        Some(url) => {
            download_file(url, path, token).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
