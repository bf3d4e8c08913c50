//! Server jar provisioning boundary.
//!
//! The pipeline only needs "make sure `<flavour>.<version>.jar` exists in this
//! directory, or tell me it can't". [`MirrorProvisioner`] is the adapter used by
//! the binary: it downloads the jar from a mirror that serves
//! `<mirror>/<flavour>/<version>`.

use crate::config::ArtifactsConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The flavour/version pair does not name a downloadable jar
    #[error("invalid_jar: {0}")]
    InvalidArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mirror returned {0}")]
    Upstream(StatusCode),
}

/// File name of the jar for a flavour and version.
pub fn artifact_file_name(flavour: &str, version: &str) -> String {
    format!("{}.{}.jar", flavour, version)
}

/// Ensures a runnable server jar exists in a directory.
#[async_trait]
pub trait ArtifactProvisioner: Send + Sync {
    /// Place `artifact_file_name(flavour, version)` inside `dir`.
    async fn provision(&self, flavour: &str, version: &str, dir: &Path) -> Result<(), ProvisionError>;
}

/// Downloads jars from an HTTP mirror
pub struct MirrorProvisioner {
    http: Client,
    config: ArtifactsConfig,
}

impl std::fmt::Debug for MirrorProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorProvisioner")
            .field("mirror_url", &self.config.mirror_url)
            .finish_non_exhaustive()
    }
}

impl MirrorProvisioner {
    pub fn new(config: &ArtifactsConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ArtifactProvisioner for MirrorProvisioner {
    async fn provision(&self, flavour: &str, version: &str, dir: &Path) -> Result<(), ProvisionError> {
        validate_component("flavour", flavour)?;
        validate_component("version", version)?;

        let url = self.config.endpoint(flavour, version);
        debug!("Fetching server jar from {}", url);

        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProvisionError::InvalidArtifact(format!(
                    "{} {} not available",
                    flavour, version
                )))
            }
            status if !status.is_success() => return Err(ProvisionError::Upstream(status)),
            _ => {}
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(ProvisionError::InvalidArtifact("empty download".to_string()));
        }

        let file_name = artifact_file_name(flavour, version);
        let target = dir.join(&file_name);
        let partial = dir.join(format!("{}.part", file_name));

        tokio::fs::write(&partial, &body).await?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        info!("Downloaded {} ({} bytes)", file_name, body.len());
        Ok(())
    }
}

/// Flavour and version become path segments, so reject anything that could escape.
fn validate_component(field: &str, value: &str) -> Result<(), ProvisionError> {
    if value.is_empty() || value == "." || value.contains("..") || value.contains(['/', '\\']) {
        return Err(ProvisionError::InvalidArtifact(format!(
            "unsupported {}: {:?}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path as UrlPath, http::StatusCode as HttpStatus, routing::get, Router};
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    /// Mock mirror serving a single jar.
    async fn start_mirror() -> String {
        async fn fetch(UrlPath((flavour, version)): UrlPath<(String, String)>) -> (HttpStatus, Vec<u8>) {
            match (flavour.as_str(), version.as_str()) {
                ("vanilla", "1.20.4") => (HttpStatus::OK, b"PK\x03\x04jar".to_vec()),
                ("empty", _) => (HttpStatus::OK, Vec::new()),
                ("broken", _) => (HttpStatus::INTERNAL_SERVER_ERROR, Vec::new()),
                _ => (HttpStatus::NOT_FOUND, Vec::new()),
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/jars/{flavour}/{version}", get(fetch));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/jars", addr)
    }

    fn provisioner(mirror_url: String) -> MirrorProvisioner {
        MirrorProvisioner::new(&ArtifactsConfig {
            mirror_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name("vanilla", "latest"), "vanilla.latest.jar");
        assert_eq!(artifact_file_name("paper", "1.20.4"), "paper.1.20.4.jar");
    }

    #[tokio::test]
    async fn test_download_writes_jar() {
        let mirror = provisioner(start_mirror().await);
        let dir = tempdir().unwrap();

        mirror.provision("vanilla", "1.20.4", dir.path()).await.unwrap();

        let jar = dir.path().join("vanilla.1.20.4.jar");
        assert_eq!(std::fs::read(jar).unwrap(), b"PK\x03\x04jar");
        assert!(!dir.path().join("vanilla.1.20.4.jar.part").exists());
    }

    #[tokio::test]
    async fn test_unknown_jar_is_invalid() {
        let mirror = provisioner(start_mirror().await);
        let dir = tempdir().unwrap();

        let result = mirror.provision("nosuch", "1.0", dir.path()).await;
        assert!(matches!(result, Err(ProvisionError::InvalidArtifact(_))));

        let result = mirror.provision("empty", "1.0", dir.path()).await;
        assert!(matches!(result, Err(ProvisionError::InvalidArtifact(_))));
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let mirror = provisioner(start_mirror().await);
        let dir = tempdir().unwrap();

        let result = mirror.provision("broken", "1.0", dir.path()).await;
        assert!(matches!(result, Err(ProvisionError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_path_components_rejected() {
        let mirror = provisioner("http://127.0.0.1:9".to_string());
        let dir = tempdir().unwrap();

        for (flavour, version) in [("../etc", "1"), ("vanilla", "a/b"), ("", "1"), ("vanilla", "..")] {
            let result = mirror.provision(flavour, version, dir.path()).await;
            assert!(matches!(result, Err(ProvisionError::InvalidArtifact(_))));
        }
    }
}
