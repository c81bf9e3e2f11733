use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use k8_types::options::Precondition;
use k8_types::ObjectMeta;

use crate::StorageError;

/// what happens to dependents of a deleted object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePropagation {
    /// dependents are deleted as well
    Cascade,
    /// dependents stay but lose their owner reference
    Orphan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    Added(Value),
    Modified(Value),
    Deleted(Value),
}

impl StorageEvent {
    pub fn value(&self) -> &Value {
        match self {
            Self::Added(value) => value,
            Self::Modified(value) => value,
            Self::Deleted(value) => value,
        }
    }
}

/// objects stored under prefix, ordered by key
#[derive(Debug, Default, Clone)]
pub struct StorageList {
    pub items: Vec<(String, Value)>,
    pub revision: u64,
}

/// key/value storage for api objects.
/// revision of every write is recorded in `metadata.resourceVersion`
#[async_trait]
pub trait StorageInterface: Debug + Send + Sync {
    /// store new object, fails if key is already taken
    async fn create(&self, key: &str, obj: Value) -> Result<Value, StorageError>;

    async fn get(&self, key: &str) -> Result<Value, StorageError>;

    /// all objects whose key is under prefix
    async fn list(&self, prefix: &str) -> Result<StorageList, StorageError>;

    /// replace existing object.
    /// if expected revision is set, it must match current revision
    async fn update(
        &self,
        key: &str,
        obj: Value,
        expected_revision: Option<u64>,
    ) -> Result<Value, StorageError>;

    /// remove object. propagation applies to objects owned by the removed one,
    /// none leaves them untouched
    async fn delete(
        &self,
        key: &str,
        precondition: Option<&Precondition>,
        propagation: Option<DeletePropagation>,
    ) -> Result<Value, StorageError>;

    /// changes for keys under prefix from now on
    fn watch(&self, prefix: &str) -> Result<BoxStream<'static, StorageEvent>, StorageError>;

    /// release resources, pending watches are terminated
    fn destroy(&self);
}

/// decode metadata section of stored object
pub fn object_meta(key: &str, value: &Value) -> Result<ObjectMeta, StorageError> {
    match value.get("metadata") {
        Some(metadata) => Ok(serde_json::from_value(metadata.clone())?),
        None => Err(StorageError::InvalidObject {
            key: key.to_owned(),
            reason: "missing metadata".to_owned(),
        }),
    }
}

/// revision recorded in stored object, 0 if it was never stored
pub fn object_revision(key: &str, value: &Value) -> Result<u64, StorageError> {
    let version = value
        .get("metadata")
        .and_then(|metadata| metadata.get("resourceVersion"))
        .and_then(|version| version.as_str())
        .unwrap_or("");
    if version.is_empty() {
        return Ok(0);
    }
    version
        .parse()
        .map_err(|_| StorageError::InvalidObject {
            key: key.to_owned(),
            reason: format!("invalid resource version: {}", version),
        })
}
