//! The runtime configuration produced by first-run setup.
//!
//! The document is stored as TOML and is only ever replaced wholesale:
//! [`RuntimeConfigFile::store`] writes a sibling temp file and renames it
//! over the canonical path, so a reader sees either the old or the new
//! document and nothing in between.

use crate::accounts::keys::{new_api_key, ApiKey};
use crate::error::{AppError, AppResult};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the service writes its own logs unless setup says otherwise.
pub const DEFAULT_LOG_DIRECTORY: &str = "./nodemc/logs";

/// Minecraft server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinecraftSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub port: u16,
    /// Heap size passed to the JVM, e.g. `1024M`
    pub ram: String,
    /// Server directory, always ending in a separator
    pub dir: String,
    /// Jar flavour (vanilla, paper, ...)
    pub jar: String,
    pub version: String,
    /// File name of the provisioned jar inside `dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jarfile: Option<String>,
}

impl Default for MinecraftSettings {
    fn default() -> Self {
        Self {
            name: None,
            port: 25565,
            ram: "1024M".to_string(),
            dir: "./minecraft/".to_string(),
            jar: "vanilla".to_string(),
            version: "latest".to_string(),
            jarfile: None,
        }
    }
}

/// Dashboard service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub apikey: ApiKey,
    pub port: u16,
    pub log_directory: String,
}

/// Dashboard UI defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    pub title: String,
    pub refresh_interval_ms: u64,
    pub console_lines: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            title: "NodeMC".to_string(),
            refresh_interval_ms: 5000,
            console_lines: 100,
        }
    }
}

/// Root runtime configuration.
///
/// `firstrun` is the bootstrap guard: while it is true the setup endpoints
/// are open and the setup key can be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub firstrun: bool,
    pub minecraft: MinecraftSettings,
    pub nodemc: ServiceSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl RuntimeConfig {
    /// First-run document holding a pre-minted setup key.
    pub fn template(apikey: ApiKey) -> Self {
        Self {
            firstrun: true,
            minecraft: MinecraftSettings::default(),
            nodemc: ServiceSettings {
                apikey,
                port: 3000,
                log_directory: DEFAULT_LOG_DIRECTORY.to_string(),
            },
            dashboard: DashboardSettings::default(),
        }
    }
}

/// Persistence adapter for the runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfigFile {
    path: PathBuf,
}

impl RuntimeConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the document at the canonical path.
    ///
    /// Blocking; async callers go through [`RuntimeConfigFile::load_async`].
    pub fn load(&self) -> AppResult<RuntimeConfig> {
        let config = Config::builder()
            .add_source(File::from(self.path.as_path()).format(FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// [`RuntimeConfigFile::load`] on the blocking pool.
    pub async fn load_async(&self) -> AppResult<RuntimeConfig> {
        let file = self.clone();
        tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| AppError::internal(format!("config load task failed: {}", e)))?
    }

    /// Replace the document on disk.
    pub async fn store(&self, config: &RuntimeConfig) -> AppResult<()> {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| AppError::PersistFailed(format!("serialize: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_failed(e))?;
        }

        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, rendered)
            .await
            .map_err(|e| self.persist_failed(e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.persist_failed(e));
        }

        Ok(())
    }

    /// Load the document, or write a fresh first-run template if none exists.
    pub async fn load_or_init(&self) -> AppResult<RuntimeConfig> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| AppError::internal(format!("{}: {}", self.path.display(), e)))?;

        if exists {
            return self.load_async().await;
        }

        let template = RuntimeConfig::template(new_api_key());
        self.store(&template).await?;
        info!("Wrote first-run configuration to {}", self.path.display());
        Ok(template)
    }

    fn persist_failed(&self, err: std::io::Error) -> AppError {
        AppError::PersistFailed(format!("{}: {}", self.path.display(), err))
    }
}
