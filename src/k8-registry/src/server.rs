//!
//! # Storage options
//!
//! Resolves storage and key layout for each resource from registry configuration.
//!
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use k8_config::RegistryConfig;
use k8_config::StorageBackend;
use k8_config::StorageConfig;
use k8_storage::InMemoryStorage;
use k8_storage::SharedStorage;
use k8_types::GroupResource;

use crate::AttrFunc;
use crate::RegistryError;
use crate::rest::RequestContext;

/// releases storage obtained from options
pub type DestroyFunc = Arc<dyn Fn() + Send + Sync>;

/// key of object with given name
pub type KeyFunc = Arc<dyn Fn(&RequestContext, &str) -> Result<String, RegistryError> + Send + Sync>;

/// prefix under which all objects of resource are stored
pub type KeyRootFunc = Arc<dyn Fn(&RequestContext) -> String + Send + Sync>;

/// options for single resource
#[derive(Clone, Default)]
pub struct RestOptions {
    pub storage_config: StorageConfig,
    pub resource_prefix: String,
    pub enable_garbage_collection: bool,
    pub delete_collection_workers: u32,
    /// injected storage, otherwise created from backend
    pub storage: Option<SharedStorage>,
}

impl fmt::Debug for RestOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RestOptions")
            .field("resource_prefix", &self.resource_prefix)
            .field("enable_garbage_collection", &self.enable_garbage_collection)
            .field("delete_collection_workers", &self.delete_collection_workers)
            .field("shared_storage", &self.storage.is_some())
            .finish()
    }
}

impl RestOptions {
    pub fn get_storage(&self) -> SharedStorage {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => match self.storage_config.backend {
                StorageBackend::Memory => InMemoryStorage::shared(),
            },
        }
    }
}

/// options handed to store completion
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub rest_options: RestOptions,
    pub attr_func: Option<AttrFunc>,
}

/// key layout and storage of single resource
#[derive(Debug, Clone)]
pub struct Options {
    rest_options: RestOptions,
}

impl Options {
    pub fn new(rest_options: RestOptions) -> Self {
        Self { rest_options }
    }

    pub fn resource_prefix(&self) -> &str {
        &self.rest_options.resource_prefix
    }

    pub fn rest_options(&self) -> RestOptions {
        self.rest_options.clone()
    }

    /// storage for objects under prefix and function releasing it
    pub fn get_storage(&self, prefix: &str) -> (SharedStorage, DestroyFunc) {
        debug!(%prefix, "creating storage");
        let storage = self.rest_options.get_storage();
        let destroy_storage = storage.clone();
        let prefix = prefix.to_owned();
        let destroy: DestroyFunc = Arc::new(move || {
            debug!(%prefix, "destroying storage");
            destroy_storage.destroy();
        });
        (storage, destroy)
    }

    /// cluster scoped roots ignore the request namespace
    pub fn key_root_func(&self, namespaced: bool) -> KeyRootFunc {
        key_root_func(format!("/{}", self.resource_prefix()), namespaced)
    }

    pub fn key_func(&self, namespaced: bool) -> KeyFunc {
        key_func(format!("/{}", self.resource_prefix()), namespaced)
    }
}

/// key root for prefix, namespaced resources append namespace of request if any
pub fn key_root_func(prefix: String, namespaced: bool) -> KeyRootFunc {
    Arc::new(move |ctx: &RequestContext| match ctx.namespace() {
        Some(ns) if namespaced && !ns.is_empty() => format!("{}/{}", prefix, ns),
        _ => prefix.clone(),
    })
}

pub fn key_func(prefix: String, namespaced: bool) -> KeyFunc {
    Arc::new(move |ctx: &RequestContext, name: &str| {
        validate_key_name(name)?;
        if namespaced {
            match ctx.namespace() {
                Some(ns) if !ns.is_empty() => Ok(format!("{}/{}/{}", prefix, ns, name)),
                _ => Err(RegistryError::BadRequest(
                    "namespace parameter required".to_owned(),
                )),
            }
        } else {
            Ok(format!("{}/{}", prefix, name))
        }
    })
}

fn validate_key_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::BadRequest(
            "name parameter required".to_owned(),
        ));
    }
    if name == "." || name == ".." {
        return Err(RegistryError::BadRequest(format!(
            "name may not be '{}'",
            name
        )));
    }
    if name.contains('/') {
        return Err(RegistryError::BadRequest(format!(
            "name may not contain '/': {}",
            name
        )));
    }
    Ok(())
}

/// hands out rest options per resource
#[derive(Clone)]
pub struct StorageFactory {
    config: StorageConfig,
    storage: Option<SharedStorage>,
}

impl fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StorageFactory")
            .field("config", &self.config)
            .finish()
    }
}

impl StorageFactory {
    pub fn new(config: StorageConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self {
            config,
            storage: None,
        })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        Self::new(config.storage.clone())
    }

    /// all resources share given storage
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn rest_options(&self, resource: &GroupResource) -> RestOptions {
        let resource_prefix = if self.config.resource_prefix.is_empty() {
            resource.resource.clone()
        } else {
            format!("{}/{}", self.config.resource_prefix, resource.resource)
        };
        RestOptions {
            storage_config: self.config.clone(),
            resource_prefix,
            enable_garbage_collection: self.config.enable_garbage_collection,
            delete_collection_workers: self.config.delete_collection_workers,
            storage: self.storage.clone(),
        }
    }

    pub fn options(&self, resource: &GroupResource) -> Options {
        Options::new(self.rest_options(resource))
    }
}
