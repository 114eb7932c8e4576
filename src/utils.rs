use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::info;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("model file {0} is missing and MODEL_URL is not set")]
    NoSource(String),
    #[error("invalid GITHUB_TOKEN format")]
    InvalidToken,
    #[error("failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to download {url}: status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

async fn download_file(url: &str, path: &Path, token: Option<&str>) -> Result<(), FetchError> {
    info!(%url, path = %path.display(), "downloading");

    let mut header_map = HeaderMap::new();

    if let Some(token) = token {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| FetchError::InvalidToken)?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let request_error = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .map_err(request_error)?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let bytes = response.bytes().await.map_err(request_error)?;

    let write_error = |source| FetchError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, bytes).await.map_err(write_error)?;

    Ok(())
}

/// Downloads the model from `MODEL_URL` when it is not already on disk.
pub async fn ensure_model_present(config: &Config) -> Result<(), FetchError> {
    info!("Checking model...");
    if config.model_path.exists() {
        return Ok(());
    }

    let url = config
        .model_url
        .as_deref()
        .ok_or_else(|| FetchError::NoSource(config.model_path.display().to_string()))?;

    download_file(url, &config.model_path, config.github_token.as_deref()).await
}

/// Creates the upload and chart directories.
pub async fn ensure_dirs(config: &Config) -> std::io::Result<()> {
    for dir in [&config.upload_dir, &config.visualization_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}
