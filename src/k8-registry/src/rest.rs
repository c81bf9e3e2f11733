//!
//! # REST verbs
//!
//! Traits exposed to request routing. A resource implements only verbs it supports.
//!
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use k8_types::options::CreateOptions;
use k8_types::options::DeleteOptions;
use k8_types::options::GetOptions;
use k8_types::options::ListOptions;
use k8_types::options::Precondition;
use k8_types::table::Table;
use k8_types::K8List;
use k8_types::K8Obj;
use k8_types::K8Watch;
use k8_types::Spec;

use crate::RegistryError;
use crate::TableInput;

/// request scoped values
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    namespace: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace<N: Into<String>>(namespace: N) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// extra validation supplied by caller, runs after strategy validation
pub type ValidateObjectFunc<S> =
    Arc<dyn Fn(&K8Obj<S>) -> Result<(), RegistryError> + Send + Sync>;

/// extra update validation supplied by caller, receives new and old object
pub type ValidateObjectUpdateFunc<S> =
    Arc<dyn Fn(&K8Obj<S>, &K8Obj<S>) -> Result<(), RegistryError> + Send + Sync>;

/// produces object to store from currently stored one
pub trait UpdatedObjectInfo<S: Spec>: Send + Sync {
    fn preconditions(&self) -> Option<Precondition> {
        None
    }

    fn updated_object(
        &self,
        ctx: &RequestContext,
        old: &K8Obj<S>,
    ) -> Result<K8Obj<S>, RegistryError>;
}

/// full replacement with given object
pub struct DefaultUpdatedObjectInfo<S: Spec> {
    obj: K8Obj<S>,
}

impl<S: Spec> DefaultUpdatedObjectInfo<S> {
    pub fn new(obj: K8Obj<S>) -> Self {
        Self { obj }
    }
}

impl<S: Spec> UpdatedObjectInfo<S> for DefaultUpdatedObjectInfo<S> {
    fn preconditions(&self) -> Option<Precondition> {
        if self.obj.metadata.uid.is_empty() {
            None
        } else {
            Some(Precondition {
                uid: Some(self.obj.metadata.uid.clone()),
                ..Default::default()
            })
        }
    }

    fn updated_object(
        &self,
        _ctx: &RequestContext,
        _old: &K8Obj<S>,
    ) -> Result<K8Obj<S>, RegistryError> {
        Ok(self.obj.clone())
    }
}

/// applies transform on copy of stored object, similar to patch
pub struct TransformUpdatedObjectInfo<F> {
    transform: F,
}

impl<F> TransformUpdatedObjectInfo<F> {
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

impl<S, F> UpdatedObjectInfo<S> for TransformUpdatedObjectInfo<F>
where
    S: Spec,
    F: Fn(K8Obj<S>) -> Result<K8Obj<S>, RegistryError> + Send + Sync,
{
    fn updated_object(
        &self,
        _ctx: &RequestContext,
        old: &K8Obj<S>,
    ) -> Result<K8Obj<S>, RegistryError> {
        (self.transform)(old.clone())
    }
}

pub trait Storage<S: Spec>: Send + Sync {
    /// empty object for decoding
    fn new_object(&self) -> K8Obj<S>;
}

#[async_trait]
pub trait Getter<S: Spec>: Storage<S> {
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<K8Obj<S>, RegistryError>;
}

#[async_trait]
pub trait Lister<S: Spec>: Storage<S> {
    fn new_list(&self) -> K8List<S>;

    async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<K8List<S>, RegistryError>;
}

#[async_trait]
pub trait Creater<S: Spec>: Storage<S> {
    async fn create(
        &self,
        ctx: &RequestContext,
        obj: K8Obj<S>,
        create_validation: Option<ValidateObjectFunc<S>>,
        options: &CreateOptions,
    ) -> Result<K8Obj<S>, RegistryError>;
}

#[async_trait]
pub trait Updater<S: Spec>: Storage<S> {
    /// returns updated object and whether it was created
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        obj_info: &dyn UpdatedObjectInfo<S>,
        create_validation: Option<ValidateObjectFunc<S>>,
        update_validation: Option<ValidateObjectUpdateFunc<S>>,
    ) -> Result<(K8Obj<S>, bool), RegistryError>;
}

#[async_trait]
pub trait GracefulDeleter<S: Spec>: Storage<S> {
    /// returns deleted object and whether deletion was immediate
    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(K8Obj<S>, bool), RegistryError>;
}

pub trait Watcher<S: Spec>: Storage<S> {
    fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<BoxStream<'static, Result<K8Watch<S>, RegistryError>>, RegistryError>;
}

#[async_trait]
pub trait CollectionDeleter<S: Spec>: Storage<S> {
    /// delete every object matched by list options, returns deleted objects
    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<K8List<S>, RegistryError>;
}

pub trait TableConvertor<S: Spec>: Send + Sync {
    fn convert_to_table(
        &self,
        ctx: &RequestContext,
        input: TableInput<'_, S>,
    ) -> Result<Table, RegistryError>;
}
