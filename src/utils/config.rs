use serde::Deserialize;
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub encryption_key: String,
}

/// Business rules for check-in and face matching.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub required_online_scans: u32,
    pub required_offline_scans: u32,
    pub match_threshold: f32,
    pub descriptor_dimension: usize,
    pub location_radius_m: f64,
    /// Check-ins later than this after the scheduled start count as late.
    pub late_after_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: "data/rollcall".to_string(),
            encryption_key: String::new(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            required_online_scans: 3,
            required_offline_scans: 1,
            match_threshold: 0.6,
            descriptor_dimension: 128,
            location_radius_m: 50.0,
            late_after_minutes: 10,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_request_size: 262_144,
        }
    }
}

impl Config {
    pub fn new() -> AppResult<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("node.host", "127.0.0.1")?
            .set_default("node.port", 8080)?
            .set_default("node.log_level", "info")?
            .set_default("storage.backend", "memory")?
            .set_default("storage.path", "data/rollcall")?
            .set_default("storage.encryption_key", "")?
            .set_default("policy.required_online_scans", 3)?
            .set_default("policy.required_offline_scans", 1)?
            .set_default("policy.match_threshold", 0.6)?
            .set_default("policy.descriptor_dimension", 128)?
            .set_default("policy.location_radius_m", 50.0)?
            .set_default("policy.late_after_minutes", 10)?
            .set_default("security.allowed_origins", Vec::<String>::new())?
            .set_default("security.max_request_size", 262_144)?  // 256KB

            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., APP__NODE__PORT)
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.node.port == 0 {
            return Err(AppError::Config("Invalid port number".into()));
        }

        if self.policy.required_online_scans == 0 {
            return Err(AppError::Config("required_online_scans must be greater than 0".into()));
        }
        if self.policy.required_offline_scans == 0 {
            return Err(AppError::Config("required_offline_scans must be greater than 0".into()));
        }
        // Scans stop counting at the online requirement.
        if self.policy.required_offline_scans > self.policy.required_online_scans {
            return Err(AppError::Config(
                "required_offline_scans must not exceed required_online_scans".into(),
            ));
        }
        if !(self.policy.match_threshold > 0.0) {
            return Err(AppError::Config("match_threshold must be greater than 0".into()));
        }
        if self.policy.descriptor_dimension == 0 {
            return Err(AppError::Config("descriptor_dimension must be greater than 0".into()));
        }
        if !(self.policy.location_radius_m > 0.0) {
            return Err(AppError::Config("location_radius_m must be greater than 0".into()));
        }

        if self.storage.backend == StorageBackend::Rocksdb {
            if self.storage.path.is_empty() {
                return Err(AppError::Config("storage path must be set for the rocksdb backend".into()));
            }
            if self.storage.encryption_key.is_empty() {
                return Err(AppError::Config("encryption_key must be set for the rocksdb backend".into()));
            }
        }

        Ok(())
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}
