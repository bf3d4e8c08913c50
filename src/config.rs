use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Web server configuration used while the first-run setup is pending.
/// After setup the service port from the runtime config takes over.
#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://nodemc.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Location of the generated runtime configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeFileConfig {
    #[serde(default = "default_runtime_path")]
    pub path: String,
}

fn default_runtime_path() -> String {
    "config/runtime.toml".to_string()
}

impl Default for RuntimeFileConfig {
    fn default() -> Self {
        Self {
            path: default_runtime_path(),
        }
    }
}

/// Server jar mirror settings
#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,
    #[serde(default = "default_artifact_timeout")]
    pub timeout_secs: u64,
}

fn default_mirror_url() -> String {
    "https://serverjars.com/api/fetchJar".to_string()
}

fn default_artifact_timeout() -> u64 {
    300
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            mirror_url: default_mirror_url(),
            timeout_secs: default_artifact_timeout(),
        }
    }
}

/// Argon2 work factor for password hashing.
/// Defaults land around 100ms per derivation on commodity hardware.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct KdfConfig {
    /// Memory cost in KiB
    #[serde(default = "default_kdf_memory")]
    pub memory_kib: u32,
    /// Number of passes
    #[serde(default = "default_kdf_iterations")]
    pub iterations: u32,
    /// Degree of parallelism
    #[serde(default = "default_kdf_parallelism")]
    pub parallelism: u32,
}

fn default_kdf_memory() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    1
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_kdf_memory(),
            iterations: default_kdf_iterations(),
            parallelism: default_kdf_parallelism(),
        }
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub runtime: RuntimeFileConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub kdf: KdfConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (prefix: NODEMC_)
            // e.g., NODEMC_WEB__PORT, NODEMC_KDF__MEMORY_KIB
            .add_source(
                Environment::with_prefix("NODEMC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Initialize the global config singleton
    pub fn init() -> Result<&'static Self, ConfigError> {
        let config = Self::load()?;
        Ok(CONFIG.get_or_init(|| config))
    }

    /// Get reference to the global config
    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized. Call AppConfig::init() first.")
    }
}

/// Helper to build the download URL for a jar flavour and version
impl ArtifactsConfig {
    pub fn endpoint(&self, flavour: &str, version: &str) -> String {
        let base = self.mirror_url.trim_end_matches('/');
        format!("{}/{}/{}", base, flavour, version)
    }
}
