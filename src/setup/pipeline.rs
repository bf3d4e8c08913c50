//! One-shot bootstrap pipeline.
//!
//! [`ConfigService`] owns the live [`RuntimeConfig`] and is the only thing
//! allowed to change it. A setup run is a strict sequence:
//!
//! 1. build the new config from the request
//! 2. make sure the server directory exists
//! 3. provision the server jar into it
//! 4. persist the whole document, then swap it in memory
//!
//! Each step hands a [`SetupContext`] to the next and any failure stops the
//! run. Nothing is written to the config file before step 4, so a failed run
//! leaves the guard set.

use crate::accounts::keys::ApiKey;
use crate::error::{AppError, AppResult};
use crate::setup::builder::{build_config, SetupRequest};
use crate::setup::provisioner::{artifact_file_name, ArtifactProvisioner, ProvisionError};
use crate::setup::runtime::{RuntimeConfig, RuntimeConfigFile};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// State threaded through the setup steps.
#[derive(Debug)]
struct SetupContext {
    config: RuntimeConfig,
    dir: PathBuf,
}

/// Owner of the runtime configuration and its bootstrap guard.
pub struct ConfigService {
    config: RwLock<RuntimeConfig>,
    /// Serializes setup runs so the guard check and clear are one critical section
    setup_lock: Mutex<()>,
    file: RuntimeConfigFile,
    provisioner: Arc<dyn ArtifactProvisioner>,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    pub fn new(
        initial: RuntimeConfig,
        file: RuntimeConfigFile,
        provisioner: Arc<dyn ArtifactProvisioner>,
    ) -> Self {
        Self {
            config: RwLock::new(initial),
            setup_lock: Mutex::new(()),
            file,
            provisioner,
        }
    }

    /// Snapshot of the current configuration.
    pub async fn current(&self) -> RuntimeConfig {
        self.config.read().await.clone()
    }

    pub async fn is_first_run(&self) -> bool {
        self.config.read().await.firstrun
    }

    /// Service-wide API key, used by the auth gate.
    pub async fn service_key(&self) -> ApiKey {
        self.config.read().await.nodemc.apikey.clone()
    }

    /// The setup key, readable only until bootstrap completes.
    pub async fn setup_key(&self) -> AppResult<ApiKey> {
        let config = self.config.read().await;
        if !config.firstrun {
            return Err(AppError::AlreadyBootstrapped);
        }
        Ok(config.nodemc.apikey.clone())
    }

    /// Run first-run setup. Succeeds at most once per config generation.
    pub async fn run_setup(&self, request: &SetupRequest) -> AppResult<RuntimeConfig> {
        let _running = self.setup_lock.lock().await;

        let current = self.current().await;
        if !current.firstrun {
            return Err(AppError::AlreadyBootstrapped);
        }

        let result = async {
            let ctx = build(request, &current)?;
            let ctx = ensure_directory(ctx).await?;
            let ctx = self.provision_artifact(ctx).await?;
            self.complete_bootstrap(ctx.config).await
        }
        .await;

        match &result {
            Ok(_) => {
                info!("New admin settings saved.");
                info!("Restart the server to apply them. You can use CTRL+C to stop the server.");
            }
            Err(e) => warn!("Setup aborted: {}", e),
        }

        result
    }

    async fn provision_artifact(&self, mut ctx: SetupContext) -> AppResult<SetupContext> {
        let jar = ctx.config.minecraft.jar.clone();
        let version = ctx.config.minecraft.version.clone();

        self.provisioner
            .provision(&jar, &version, &ctx.dir)
            .await
            .map_err(|e| match e {
                ProvisionError::InvalidArtifact(_) => {
                    AppError::ArtifactProvisionFailed("invalid_jar".to_string())
                }
                other => AppError::ArtifactProvisionFailed(other.to_string()),
            })?;

        ctx.config.minecraft.jarfile = Some(artifact_file_name(&jar, &version));
        Ok(ctx)
    }

    /// Persist `next` and only then make it the live config.
    async fn complete_bootstrap(&self, next: RuntimeConfig) -> AppResult<RuntimeConfig> {
        self.file.store(&next).await?;
        *self.config.write().await = next.clone();
        Ok(next)
    }
}

fn build(request: &SetupRequest, current: &RuntimeConfig) -> AppResult<SetupContext> {
    let config = build_config(request, current)?;
    let dir = PathBuf::from(&config.minecraft.dir);
    Ok(SetupContext { config, dir })
}

async fn ensure_directory(ctx: SetupContext) -> AppResult<SetupContext> {
    let dir_failed = |source: std::io::Error| AppError::DirectoryFailed {
        path: ctx.dir.display().to_string(),
        source,
    };

    let exists = tokio::fs::try_exists(&ctx.dir).await.map_err(dir_failed)?;
    if !exists {
        tokio::fs::create_dir_all(&ctx.dir).await.map_err(dir_failed)?;
        info!("Created server directory {}", ctx.dir.display());
    } else if !tokio::fs::metadata(&ctx.dir).await.map_err(dir_failed)?.is_dir() {
        return Err(dir_failed(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        )));
    }
    Ok(ctx)
}
