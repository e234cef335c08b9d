use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{Result, NodeError};

pub const GOOGLE_SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the JSON body of an enrollment request.
    pub max_payload_bytes: usize,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root under which `<BRANCH>/<folder>/` enrollment directories are created.
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Service-account credential file of the identity provider project.
    pub credentials_path: PathBuf,
    pub jwks_url: String,
    pub key_refresh_secs: u64,
    /// How long past `key_refresh_secs` cached keys may serve while the
    /// endpoint is unreachable. Zero disables the fallback.
    pub max_stale_secs: u64,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub directory: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self::defaults()?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., APP_SERVER__PORT)
            .add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"))

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.max_payload_bytes", 20 * 1024 * 1024)?  // 20MB
            .set_default("storage.root_dir", "enrollment_data")?
            .set_default("auth.credentials_path", "service-account.json")?
            .set_default("auth.jwks_url", GOOGLE_SECURETOKEN_JWKS_URL)?
            .set_default("auth.key_refresh_secs", 3600)?
            .set_default("auth.max_stale_secs", 3600)?
            .set_default("auth.http_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)
    }

    /// Configuration with every default applied and no file or environment sources.
    pub fn with_defaults() -> Result<Self> {
        let config: Self = Self::defaults()?.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(NodeError::Config("Invalid port number".into()));
        }
        if self.server.max_payload_bytes == 0 {
            return Err(NodeError::Config("max_payload_bytes must be greater than 0".into()));
        }
        if let Some(0) = self.server.workers {
            return Err(NodeError::Config("workers must be greater than 0".into()));
        }

        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(NodeError::Config("storage root_dir must be set".into()));
        }

        if self.auth.credentials_path.as_os_str().is_empty() {
            return Err(NodeError::Config("auth credentials_path must be set".into()));
        }
        if self.auth.jwks_url.is_empty() {
            return Err(NodeError::Config("auth jwks_url must be set".into()));
        }
        if self.auth.key_refresh_secs == 0 {
            return Err(NodeError::Config("key_refresh_secs must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn get_key_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auth.key_refresh_secs)
    }

    pub fn get_key_max_stale(&self) -> Duration {
        Duration::from_secs(self.auth.max_stale_secs)
    }

    pub fn get_http_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.http_timeout_secs)
    }
}

impl From<ConfigError> for NodeError {
    fn from(error: ConfigError) -> Self {
        NodeError::Config(error.to_string())
    }
}
