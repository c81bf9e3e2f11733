use std::env;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

use dirs::home_dir;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::ConfigError;

pub const CONFIG_ENV: &str = "SERVICE_CATALOG_CONFIG";
pub const DEFAULT_RESOURCE_PREFIX: &str = "servicecatalog.k8s.io";

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// how registry stores objects
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub resource_prefix: String,
    pub enable_garbage_collection: bool,
    pub delete_collection_workers: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            resource_prefix: DEFAULT_RESOURCE_PREFIX.to_owned(),
            enable_garbage_collection: true,
            delete_collection_workers: 1,
        }
    }
}

impl StorageConfig {
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Self {
        self.resource_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "resourcePrefix",
                reason: format!("'{}' contains whitespace", self.resource_prefix),
            });
        }
        if self.delete_collection_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "deleteCollectionWorkers",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    #[serde(skip)]
    pub path: Option<PathBuf>,
    pub storage: StorageConfig,
}

impl RegistryConfig {
    /// load from env var path, then from home directory, otherwise defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            debug!(%path, "loading registry config from env");
            return Self::from_file(path);
        }

        if let Some(path) = Self::home_path() {
            if path.exists() {
                debug!(path = %path.display(), "loading registry config from home");
                return Self::from_file(path);
            }
        }

        debug!("no registry config found, using defaults");
        Ok(Self::default())
    }

    /// default config location in home directory
    pub fn home_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".service-catalog").join("config.yaml"))
    }

    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let mut config: Self = serde_yaml::from_reader(file)?;
        config.storage.validate()?;
        config.path = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    pub fn to_file<T: AsRef<Path>>(&self, path: T) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        Ok(serde_yaml::to_writer(file, self)?)
    }
}
