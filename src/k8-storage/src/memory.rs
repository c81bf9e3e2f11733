use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::channel::mpsc::unbounded;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::BoxStream;
use futures::stream::StreamExt;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use k8_types::options::Precondition;

use crate::object_meta;
use crate::object_revision;
use crate::DeletePropagation;
use crate::StorageError;
use crate::StorageEvent;
use crate::StorageInterface;
use crate::StorageList;

#[derive(Debug)]
struct Watcher {
    prefix: String,
    sender: UnboundedSender<StorageEvent>,
}

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<String, Value>,
    revision: u64,
    watchers: Vec<Watcher>,
    destroyed: bool,
}

impl Inner {
    fn check_live(&self) -> Result<(), StorageError> {
        if self.destroyed {
            Err(StorageError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// stamp object with next revision
    fn next_revision(&mut self, key: &str, value: &mut Value) -> Result<u64, StorageError> {
        let revision = self.revision + 1;
        match value.get_mut("metadata").and_then(|meta| meta.as_object_mut()) {
            Some(metadata) => {
                metadata.insert(
                    "resourceVersion".to_owned(),
                    Value::String(revision.to_string()),
                );
            }
            None => {
                return Err(StorageError::InvalidObject {
                    key: key.to_owned(),
                    reason: "missing metadata".to_owned(),
                })
            }
        }
        self.revision = revision;
        Ok(revision)
    }

    fn notify(&mut self, key: &str, event: StorageEvent) {
        // watchers whose receiver is gone are dropped
        self.watchers.retain(|watcher| {
            if !key.starts_with(&watcher.prefix) {
                return true;
            }
            watcher.sender.unbounded_send(event.clone()).is_ok()
        });
    }

    fn current_revision(&self, key: &str) -> Result<u64, StorageError> {
        match self.items.get(key) {
            Some(value) => object_revision(key, value),
            None => Err(StorageError::NotFound {
                key: key.to_owned(),
            }),
        }
    }

    fn check_precondition(
        &self,
        key: &str,
        current: &Value,
        precondition: &Precondition,
    ) -> Result<(), StorageError> {
        let meta = object_meta(key, current)?;
        if let Some(uid) = &precondition.uid {
            if *uid != meta.uid {
                return Err(StorageError::PreconditionFailed {
                    key: key.to_owned(),
                    reason: format!("uid in precondition: {}, uid in object: {}", uid, meta.uid),
                });
            }
        }
        if let Some(version) = &precondition.resource_version {
            if *version != meta.resource_version {
                return Err(StorageError::PreconditionFailed {
                    key: key.to_owned(),
                    reason: format!(
                        "resource version in precondition: {}, resource version in object: {}",
                        version, meta.resource_version
                    ),
                });
            }
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<Value, StorageError> {
        let value = self.items.remove(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_owned(),
        })?;
        self.revision += 1;
        self.notify(key, StorageEvent::Deleted(value.clone()));
        Ok(value)
    }

    /// keys of objects owned by uid
    fn dependents(&self, uid: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = vec![];
        for (key, value) in &self.items {
            if object_meta(key, value)?.is_owned_by(uid) {
                keys.push(key.clone());
            }
        }
        Ok(keys)
    }

    fn collect_garbage(
        &mut self,
        owner_uid: String,
        propagation: DeletePropagation,
    ) -> Result<(), StorageError> {
        match propagation {
            DeletePropagation::Cascade => {
                let mut pending = vec![owner_uid];
                while let Some(uid) = pending.pop() {
                    for key in self.dependents(&uid)? {
                        let removed = self.remove(&key)?;
                        debug!(%key, owner = %uid, "removed dependent");
                        let meta = object_meta(&key, &removed)?;
                        if !meta.uid.is_empty() {
                            pending.push(meta.uid);
                        }
                    }
                }
            }
            DeletePropagation::Orphan => {
                for key in self.dependents(&owner_uid)? {
                    let mut value = self.items.get(&key).cloned().unwrap_or(Value::Null);
                    if let Some(owners) = value
                        .get_mut("metadata")
                        .and_then(|meta| meta.get_mut("ownerReferences"))
                        .and_then(|owners| owners.as_array_mut())
                    {
                        owners.retain(|owner| {
                            owner.get("uid").and_then(|uid| uid.as_str()) != Some(owner_uid.as_str())
                        });
                    }
                    self.next_revision(&key, &mut value)?;
                    debug!(%key, owner = %owner_uid, "orphaned dependent");
                    self.items.insert(key.clone(), value.clone());
                    self.notify(&key, StorageEvent::Modified(value));
                }
            }
        }
        Ok(())
    }
}

/// storage held in process memory
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> crate::SharedStorage {
        std::sync::Arc::new(Self::new())
    }

    /// revision of last write
    pub fn revision(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read()?.revision)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read()?.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{}/", prefix)
    }
}

#[async_trait]
impl StorageInterface for InMemoryStorage {
    async fn create(&self, key: &str, mut obj: Value) -> Result<Value, StorageError> {
        let mut inner = self.inner.write()?;
        inner.check_live()?;
        if inner.items.contains_key(key) {
            return Err(StorageError::AlreadyExists {
                key: key.to_owned(),
            });
        }
        let revision = inner.next_revision(key, &mut obj)?;
        debug!(%key, revision, "created");
        trace!("created object: {:#?}", obj);
        inner.items.insert(key.to_owned(), obj.clone());
        inner.notify(key, StorageEvent::Added(obj.clone()));
        Ok(obj)
    }

    async fn get(&self, key: &str) -> Result<Value, StorageError> {
        let inner = self.inner.read()?;
        inner.check_live()?;
        inner
            .items
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_owned(),
            })
    }

    async fn list(&self, prefix: &str) -> Result<StorageList, StorageError> {
        let inner = self.inner.read()?;
        inner.check_live()?;
        let prefix = normalize_prefix(prefix);
        let items = inner
            .items
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(StorageList {
            items,
            revision: inner.revision,
        })
    }

    async fn update(
        &self,
        key: &str,
        mut obj: Value,
        expected_revision: Option<u64>,
    ) -> Result<Value, StorageError> {
        let mut inner = self.inner.write()?;
        inner.check_live()?;
        let actual = inner.current_revision(key)?;
        if let Some(expected) = expected_revision {
            if expected != actual {
                debug!(%key, expected, actual, "revision conflict");
                return Err(StorageError::Conflict {
                    key: key.to_owned(),
                    expected,
                    actual,
                });
            }
        }
        let revision = inner.next_revision(key, &mut obj)?;
        debug!(%key, revision, "updated");
        inner.items.insert(key.to_owned(), obj.clone());
        inner.notify(key, StorageEvent::Modified(obj.clone()));
        Ok(obj)
    }

    async fn delete(
        &self,
        key: &str,
        precondition: Option<&Precondition>,
        propagation: Option<DeletePropagation>,
    ) -> Result<Value, StorageError> {
        let mut inner = self.inner.write()?;
        inner.check_live()?;
        if let Some(precondition) = precondition {
            let current = inner.items.get(key).ok_or_else(|| StorageError::NotFound {
                key: key.to_owned(),
            })?;
            inner.check_precondition(key, current, precondition)?;
        }
        let removed = inner.remove(key)?;
        debug!(%key, ?propagation, "deleted");
        if let Some(propagation) = propagation {
            let uid = object_meta(key, &removed)?.uid;
            if !uid.is_empty() {
                inner.collect_garbage(uid, propagation)?;
            }
        }
        Ok(removed)
    }

    fn watch(&self, prefix: &str) -> Result<BoxStream<'static, StorageEvent>, StorageError> {
        let mut inner = self.inner.write()?;
        inner.check_live()?;
        let (sender, receiver) = unbounded();
        inner.watchers.push(Watcher {
            prefix: normalize_prefix(prefix),
            sender,
        });
        Ok(receiver.boxed())
    }

    fn destroy(&self) {
        match self.inner.write() {
            Ok(mut inner) => {
                debug!(watchers = inner.watchers.len(), "destroying in memory storage");
                inner.destroyed = true;
                inner.watchers.clear();
                inner.items.clear();
            }
            Err(_) => tracing::error!("lock poisoned while destroying storage"),
        }
    }
}
