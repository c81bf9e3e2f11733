//!
//! # Generic store
//!
//! Maps REST verbs of one resource onto backing storage.
//! Store is configured by filling its fields and then calling `complete_with_options`.
//!
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono::Utc;
use futures::future::join_all;
use futures::future::ready;
use futures::stream::BoxStream;
use futures::stream::StreamExt;
use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::trace;
use uuid::Uuid;

use k8_storage::DeletePropagation;
use k8_storage::SharedStorage;
use k8_storage::StorageError;
use k8_storage::StorageEvent;
use k8_types::options::CreateOptions;
use k8_types::options::DeleteOptions;
use k8_types::options::GetOptions;
use k8_types::options::ListOptions;
use k8_types::options::Precondition;
use k8_types::options::PropagationPolicy;
use k8_types::selector::Selector;
use k8_types::table::Table;
use k8_types::GroupResource;
use k8_types::K8List;
use k8_types::K8Obj;
use k8_types::K8Watch;
use k8_types::Spec;

use crate::default_cluster_scoped_attr;
use crate::default_namespace_scoped_attr;
use crate::default_table_convertor;
use crate::key_func;
use crate::key_root_func;
use crate::predicate_with_attrs;
use crate::rest::CollectionDeleter;
use crate::rest::Creater;
use crate::rest::Getter;
use crate::rest::GracefulDeleter;
use crate::rest::Lister;
use crate::rest::RequestContext;
use crate::rest::Storage;
use crate::rest::TableConvertor;
use crate::rest::UpdatedObjectInfo;
use crate::rest::ValidateObjectFunc;
use crate::rest::ValidateObjectUpdateFunc;
use crate::rest::Watcher;
use crate::strategy::RestCreateStrategy;
use crate::strategy::RestDeleteStrategy;
use crate::strategy::RestUpdateStrategy;
use crate::DestroyFunc;
use crate::FieldError;
use crate::KeyFunc;
use crate::KeyRootFunc;
use crate::Options;
use crate::PredicateFunc;
use crate::RegistryError;
use crate::SelectionPredicate;
use crate::StoreOptions;
use crate::TableInput;

pub type NewFunc<S> = Arc<dyn Fn() -> K8Obj<S> + Send + Sync>;
pub type NewListFunc<S> = Arc<dyn Fn() -> K8List<S> + Send + Sync>;
pub type ObjectNameFunc<S> = Arc<dyn Fn(&K8Obj<S>) -> Result<String, RegistryError> + Send + Sync>;

/// REST storage of single resource.
/// cloning is cheap, clones share storage and strategies
#[derive(Clone, Default)]
pub struct Store<S: Spec> {
    pub new_func: Option<NewFunc<S>>,
    pub new_list_func: Option<NewListFunc<S>>,
    pub key_root_func: Option<KeyRootFunc>,
    pub key_func: Option<KeyFunc>,
    pub object_name_func: Option<ObjectNameFunc<S>>,
    pub predicate_func: Option<PredicateFunc>,
    /// used in error messages
    pub default_qualified_resource: GroupResource,
    pub create_strategy: Option<Arc<dyn RestCreateStrategy<S>>>,
    pub update_strategy: Option<Arc<dyn RestUpdateStrategy<S>>>,
    pub delete_strategy: Option<Arc<dyn RestDeleteStrategy<S>>>,
    pub enable_garbage_collection: bool,
    pub delete_collection_workers: u32,
    pub table_convertor: Option<Arc<dyn TableConvertor<S>>>,
    pub storage: Option<SharedStorage>,
    pub destroy_func: Option<DestroyFunc>,
}

impl<S: Spec> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Store")
            .field("kind", &S::kind())
            .field("resource", &self.default_qualified_resource.to_string())
            .field("enable_garbage_collection", &self.enable_garbage_collection)
            .field("storage", &self.storage)
            .finish()
    }
}

impl<S: Spec> Store<S> {
    /// validate configuration and fill unset fields from options
    pub fn complete_with_options(&mut self, options: &StoreOptions) -> Result<(), RegistryError> {
        let kind = S::kind();
        if self.default_qualified_resource.is_empty() {
            return Err(RegistryError::Config(format!(
                "store for {} has an unset DefaultQualifiedResource",
                kind
            )));
        }
        if self.new_func.is_none() {
            return Err(RegistryError::Config(format!(
                "store for {} must have NewFunc set",
                kind
            )));
        }
        if self.new_list_func.is_none() {
            return Err(RegistryError::Config(format!(
                "store for {} must have NewListFunc set",
                kind
            )));
        }
        if self.key_root_func.is_some() != self.key_func.is_some() {
            return Err(RegistryError::Config(format!(
                "store for {} must set both KeyRootFunc and KeyFunc or neither",
                kind
            )));
        }

        let namespaced = match (&self.create_strategy, &self.update_strategy) {
            (Some(create), _) => create.namespace_scoped(),
            (None, Some(update)) => update.namespace_scoped(),
            (None, None) => {
                return Err(RegistryError::Config(format!(
                    "store for {} must have CreateStrategy or UpdateStrategy set",
                    kind
                )))
            }
        };
        let delete_namespaced = match &self.delete_strategy {
            Some(delete) => delete.namespace_scoped(),
            None => {
                return Err(RegistryError::Config(format!(
                    "store for {} must have DeleteStrategy set",
                    kind
                )))
            }
        };
        let update_namespaced = self
            .update_strategy
            .as_ref()
            .map(|update| update.namespace_scoped())
            .unwrap_or(namespaced);
        if namespaced != update_namespaced || namespaced != delete_namespaced {
            return Err(RegistryError::Config(format!(
                "store for {} has strategies which disagree on namespace scope",
                kind
            )));
        }

        let rest_options = &options.rest_options;
        let prefix = if rest_options.resource_prefix.starts_with('/') {
            rest_options.resource_prefix.clone()
        } else {
            format!("/{}", rest_options.resource_prefix)
        };
        if prefix == "/" {
            return Err(RegistryError::Config(format!(
                "store for {} has an invalid prefix \"{}\"",
                kind, rest_options.resource_prefix
            )));
        }

        if self.key_root_func.is_none() {
            self.key_root_func = Some(key_root_func(prefix.clone(), namespaced));
            self.key_func = Some(key_func(prefix.clone(), namespaced));
        }

        if self.object_name_func.is_none() {
            self.object_name_func = Some(Arc::new(meta_name::<S>));
        }

        if self.predicate_func.is_none() {
            let attr_func = options.attr_func.unwrap_or(if namespaced {
                default_namespace_scoped_attr
            } else {
                default_cluster_scoped_attr
            });
            self.predicate_func = Some(predicate_with_attrs(attr_func));
        }

        self.enable_garbage_collection = rest_options.enable_garbage_collection;
        self.delete_collection_workers = rest_options.delete_collection_workers;

        if self.storage.is_none() {
            let (storage, destroy) = Options::new(rest_options.clone()).get_storage(&prefix);
            self.storage = Some(storage);
            self.destroy_func = Some(destroy);
        }

        if self.table_convertor.is_none() {
            self.table_convertor = Some(Arc::new(default_table_convertor::<S>()));
        }

        debug!(%kind, resource = %self.default_qualified_resource, %prefix, "store completed");
        Ok(())
    }

    /// release storage
    pub fn destroy(&self) {
        if let Some(destroy) = &self.destroy_func {
            destroy();
        }
    }

    pub fn qualified_resource(&self) -> &GroupResource {
        &self.default_qualified_resource
    }

    fn not_completed(&self, field: &str) -> RegistryError {
        RegistryError::Config(format!(
            "store for {} is not completed: {} unset",
            S::kind(),
            field
        ))
    }

    fn storage(&self) -> Result<&SharedStorage, RegistryError> {
        self.storage.as_ref().ok_or_else(|| self.not_completed("Storage"))
    }

    fn key(&self, ctx: &RequestContext, name: &str) -> Result<String, RegistryError> {
        match &self.key_func {
            Some(key_func) => key_func(ctx, name),
            None => Err(self.not_completed("KeyFunc")),
        }
    }

    fn key_root(&self, ctx: &RequestContext) -> Result<String, RegistryError> {
        match &self.key_root_func {
            Some(key_root_func) => Ok(key_root_func(ctx)),
            None => Err(self.not_completed("KeyRootFunc")),
        }
    }

    fn object_name(&self, obj: &K8Obj<S>) -> Result<String, RegistryError> {
        match &self.object_name_func {
            Some(name_func) => name_func(obj),
            None => Ok(obj.metadata.name.clone()),
        }
    }

    fn predicate(&self, options: &ListOptions) -> Result<SelectionPredicate, RegistryError> {
        let label = Selector::parse(options.label_selector.as_deref().unwrap_or(""))?;
        let field = Selector::parse(options.field_selector.as_deref().unwrap_or(""))?;
        match &self.predicate_func {
            Some(predicate_func) => Ok(predicate_func(label, field)),
            None => Err(self.not_completed("PredicateFunc")),
        }
    }

    fn namespace_scoped(&self) -> bool {
        self.create_strategy
            .as_ref()
            .map(|strategy| strategy.namespace_scoped())
            .unwrap_or(S::NAME_SPACED)
    }

    /// namespace of object must agree with request
    fn fill_namespace(&self, ctx: &RequestContext, obj: &mut K8Obj<S>) -> Result<(), RegistryError> {
        if !self.namespace_scoped() {
            obj.metadata.namespace.clear();
            return Ok(());
        }
        match ctx.namespace() {
            Some(ns) if obj.metadata.namespace.is_empty() => {
                obj.metadata.namespace = ns.to_owned();
                Ok(())
            }
            Some(ns) if ns != obj.metadata.namespace => Err(RegistryError::BadRequest(
                "the namespace of the provided object does not match the namespace sent on the request"
                    .to_owned(),
            )),
            _ => Ok(()),
        }
    }

    fn invalid(&self, name: &str, causes: Vec<FieldError>) -> Result<(), RegistryError> {
        if causes.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::invalid(
                self.default_qualified_resource.clone(),
                name,
                causes,
            ))
        }
    }

    fn decode(&self, value: Value) -> Result<K8Obj<S>, RegistryError> {
        let obj: K8Obj<S> = serde_json::from_value(value)?;
        if obj.kind != S::kind() {
            return Err(RegistryError::not_of_expected_kind(S::kind(), obj.kind));
        }
        Ok(obj)
    }

    async fn create_object(
        &self,
        ctx: &RequestContext,
        mut obj: K8Obj<S>,
        create_validation: Option<ValidateObjectFunc<S>>,
        options: &CreateOptions,
    ) -> Result<K8Obj<S>, RegistryError> {
        let strategy = self
            .create_strategy
            .as_ref()
            .ok_or_else(|| self.not_completed("CreateStrategy"))?;

        if !obj.metadata.resource_version.is_empty() {
            return Err(RegistryError::BadRequest(
                "resourceVersion should not be set on objects to be created".to_owned(),
            ));
        }
        self.fill_namespace(ctx, &mut obj)?;
        obj.api_version = S::api_version();
        obj.kind = S::kind();
        obj.metadata.uid = Uuid::new_v4().to_string();
        obj.metadata.creation_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        obj.metadata.deletion_timestamp = None;
        strategy.prepare_for_create(&mut obj);

        let name = self.object_name(&obj)?;
        self.invalid(&name, strategy.validate(&obj))?;
        strategy.canonicalize(&mut obj);
        if let Some(validation) = create_validation {
            validation(&obj)?;
        }

        let key = self.key(ctx, &name)?;
        debug!(resource = %self.default_qualified_resource, %key, "create");
        trace!("create object: {:#?}", obj);
        if options.dry_run {
            return Ok(obj);
        }
        let value = self.storage()?.create(&key, serde_json::to_value(&obj)?).await?;
        self.decode(value)
    }

    async fn delete_object(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<K8Obj<S>, RegistryError> {
        let key = self.key(ctx, name)?;
        let propagation = if self.enable_garbage_collection {
            match options.propagation_policy {
                Some(PropagationPolicy::Orphan) => Some(DeletePropagation::Orphan),
                _ => Some(DeletePropagation::Cascade),
            }
        } else {
            None
        };
        debug!(resource = %self.default_qualified_resource, %key, ?propagation, "delete");
        let removed = self
            .storage()?
            .delete(&key, options.preconditions.as_ref(), propagation)
            .await?;
        self.decode(removed)
    }
}

fn meta_name<S: Spec>(obj: &K8Obj<S>) -> Result<String, RegistryError> {
    Ok(obj.metadata.name.clone())
}

fn parse_resource_version(key: &str, version: &str) -> Result<u64, RegistryError> {
    version.parse().map_err(|_| {
        RegistryError::BadRequest(format!(
            "invalid resource version {} for {}",
            version, key
        ))
    })
}

fn check_preconditions<S: Spec>(
    key: &str,
    precondition: &Precondition,
    existing: &K8Obj<S>,
) -> Result<(), RegistryError> {
    if let Some(uid) = &precondition.uid {
        if *uid != existing.metadata.uid {
            return Err(StorageError::PreconditionFailed {
                key: key.to_owned(),
                reason: format!(
                    "uid in precondition: {}, uid in object: {}",
                    uid, existing.metadata.uid
                ),
            }
            .into());
        }
    }
    if let Some(version) = &precondition.resource_version {
        if *version != existing.metadata.resource_version {
            return Err(StorageError::PreconditionFailed {
                key: key.to_owned(),
                reason: format!(
                    "resource version in precondition: {}, resource version in object: {}",
                    version, existing.metadata.resource_version
                ),
            }
            .into());
        }
    }
    Ok(())
}

fn watch_event<S: Spec>(event: StorageEvent) -> Result<K8Watch<S>, RegistryError> {
    let watch = match event {
        StorageEvent::Added(value) => K8Watch::ADDED(serde_json::from_value(value)?),
        StorageEvent::Modified(value) => K8Watch::MODIFIED(serde_json::from_value(value)?),
        StorageEvent::Deleted(value) => K8Watch::DELETED(serde_json::from_value(value)?),
    };
    Ok(watch)
}

impl<S: Spec> Storage<S> for Store<S> {
    fn new_object(&self) -> K8Obj<S> {
        self.new_func.as_ref().map(|new| new()).unwrap_or_default()
    }
}

#[async_trait]
impl<S: Spec> Getter<S> for Store<S> {
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<K8Obj<S>, RegistryError> {
        let key = self.key(ctx, name)?;
        debug!(resource = %self.default_qualified_resource, %key, version = ?options.resource_version, "get");
        let value = self.storage()?.get(&key).await?;
        self.decode(value)
    }
}

#[async_trait]
impl<S: Spec> Lister<S> for Store<S> {
    fn new_list(&self) -> K8List<S> {
        self.new_list_func
            .as_ref()
            .map(|new_list| new_list())
            .unwrap_or_default()
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<K8List<S>, RegistryError> {
        let predicate = self.predicate(options)?;
        let root = self.key_root(ctx)?;
        let storage = self.storage()?;
        let mut list = self.new_list();

        // single name shortcut, falls back to full list when no key can be built
        if let Some(name) = predicate.matches_single() {
            if let Ok(key) = self.key(ctx, name) {
                debug!(resource = %self.default_qualified_resource, %key, "list single");
                match storage.get(&key).await {
                    Ok(value) => {
                        let obj = self.decode(value)?;
                        list.metadata.resource_version = obj.metadata.resource_version.clone();
                        if predicate.matches(&obj)? {
                            list.items.push(obj);
                        }
                    }
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err.into()),
                }
                return Ok(list);
            }
        }

        if let Some(token) = &options.continu {
            if !token.starts_with(&root) {
                return Err(RegistryError::BadRequest(format!(
                    "continue token {} does not belong to {}",
                    token, root
                )));
            }
        }

        debug!(resource = %self.default_qualified_resource, %root, ?predicate, "list");
        let stored = storage.list(&root).await?;
        list.metadata.resource_version = stored.revision.to_string();
        let limit = options.limit.unwrap_or(0) as usize;
        let mut last_key: Option<String> = None;
        for (key, value) in stored.items {
            if let Some(token) = &options.continu {
                if key.as_str() <= token.as_str() {
                    continue;
                }
            }
            let obj = self.decode(value)?;
            if !predicate.matches(&obj)? {
                continue;
            }
            if limit > 0 && list.items.len() == limit {
                list.metadata._continue = last_key;
                break;
            }
            last_key = Some(key);
            list.items.push(obj);
        }
        trace!("listed {} items", list.items.len());
        Ok(list)
    }
}

#[async_trait]
impl<S: Spec> Creater<S> for Store<S> {
    async fn create(
        &self,
        ctx: &RequestContext,
        obj: K8Obj<S>,
        create_validation: Option<ValidateObjectFunc<S>>,
        options: &CreateOptions,
    ) -> Result<K8Obj<S>, RegistryError> {
        self.create_object(ctx, obj, create_validation, options)
            .await
    }
}

#[async_trait]
impl<S: Spec> crate::rest::Updater<S> for Store<S> {
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        obj_info: &dyn UpdatedObjectInfo<S>,
        create_validation: Option<ValidateObjectFunc<S>>,
        update_validation: Option<ValidateObjectUpdateFunc<S>>,
    ) -> Result<(K8Obj<S>, bool), RegistryError> {
        let key = self.key(ctx, name)?;
        let strategy = self
            .update_strategy
            .as_ref()
            .ok_or_else(|| self.not_completed("UpdateStrategy"))?;
        let storage = self.storage()?;

        let existing = match storage.get(&key).await {
            Ok(value) => Some(self.decode(value)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        let existing = match existing {
            Some(existing) => existing,
            None => {
                let obj = obj_info.updated_object(ctx, &self.new_object())?;
                if !strategy.allow_create_on_update() || !obj.metadata.resource_version.is_empty()
                {
                    return Err(StorageError::NotFound { key }.into());
                }
                debug!(resource = %self.default_qualified_resource, %key, "create on update");
                let created = self
                    .create_object(ctx, obj, create_validation, &CreateOptions::default())
                    .await?;
                return Ok((created, true));
            }
        };

        if let Some(precondition) = obj_info.preconditions() {
            check_preconditions(&key, &precondition, &existing)?;
        }

        let mut obj = obj_info.updated_object(ctx, &existing)?;
        let expected = if obj.metadata.resource_version.is_empty() {
            if !strategy.allow_unconditional_update() {
                return Err(RegistryError::invalid(
                    self.default_qualified_resource.clone(),
                    name,
                    vec![FieldError::invalid(
                        "metadata.resourceVersion",
                        "must be specified for an update",
                    )],
                ));
            }
            parse_resource_version(&key, &existing.metadata.resource_version)?
        } else {
            parse_resource_version(&key, &obj.metadata.resource_version)?
        };

        self.fill_namespace(ctx, &mut obj)?;
        if obj.metadata.uid.is_empty() {
            obj.metadata.uid = existing.metadata.uid.clone();
        }
        if obj.metadata.uid != existing.metadata.uid {
            self.invalid(
                name,
                vec![FieldError::invalid("metadata.uid", "field is immutable")],
            )?;
        }
        obj.api_version = S::api_version();
        obj.kind = S::kind();
        obj.metadata.name = existing.metadata.name.clone();
        obj.metadata.creation_timestamp = existing.metadata.creation_timestamp.clone();
        obj.metadata.generation = existing.metadata.generation;
        strategy.prepare_for_update(&mut obj, &existing);

        self.invalid(name, strategy.validate_update(&obj, &existing))?;
        strategy.canonicalize(&mut obj);
        if let Some(validation) = update_validation {
            validation(&obj, &existing)?;
        }

        debug!(resource = %self.default_qualified_resource, %key, expected, "update");
        trace!("update object: {:#?}", obj);
        let value = storage
            .update(&key, serde_json::to_value(&obj)?, Some(expected))
            .await?;
        Ok((self.decode(value)?, false))
    }
}

#[async_trait]
impl<S: Spec> GracefulDeleter<S> for Store<S> {
    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(K8Obj<S>, bool), RegistryError> {
        let removed = self.delete_object(ctx, name, options).await?;
        Ok((removed, true))
    }
}

#[async_trait]
impl<S: Spec> CollectionDeleter<S> for Store<S> {
    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<K8List<S>, RegistryError> {
        let mut list_options = list_options.clone();
        list_options.limit = None;
        list_options.continu = None;
        let matched = self.list(ctx, &list_options).await?;

        let workers = self.delete_collection_workers.max(1) as usize;
        let names: Vec<String> = matched
            .items
            .iter()
            .map(|obj| obj.metadata.name.clone())
            .collect();
        debug!(resource = %self.default_qualified_resource, count = names.len(), workers, "delete collection");

        let mut deleted = self.new_list();
        deleted.metadata = matched.metadata;
        for chunk in names.chunks(workers) {
            let results =
                join_all(chunk.iter().map(|name| self.delete_object(ctx, name, options))).await;
            for result in results {
                match result {
                    Ok(obj) => deleted.items.push(obj),
                    // removed meanwhile, possibly by garbage collection
                    Err(err) if err.is_not_found() => {}
                    Err(err) => {
                        error!("delete collection failed: {}", err);
                        return Err(err);
                    }
                }
            }
        }
        Ok(deleted)
    }
}

impl<S: Spec> Watcher<S> for Store<S> {
    fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<BoxStream<'static, Result<K8Watch<S>, RegistryError>>, RegistryError> {
        let predicate = self.predicate(options)?;
        let root = self.key_root(ctx)?;
        debug!(resource = %self.default_qualified_resource, %root, ?predicate, "watch");
        let stream = self.storage()?.watch(&root)?.filter_map(move |event| {
            let item = match watch_event::<S>(event) {
                Ok(watch) => match predicate.matches(match &watch {
                    K8Watch::ADDED(obj) | K8Watch::MODIFIED(obj) | K8Watch::DELETED(obj) => obj,
                }) {
                    Ok(true) => Some(Ok(watch)),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                },
                Err(err) => Some(Err(err)),
            };
            ready(item)
        });
        Ok(stream.boxed())
    }
}

impl<S: Spec> TableConvertor<S> for Store<S> {
    fn convert_to_table(
        &self,
        ctx: &RequestContext,
        input: TableInput<'_, S>,
    ) -> Result<Table, RegistryError> {
        match &self.table_convertor {
            Some(convertor) => convertor.convert_to_table(ctx, input),
            None => default_table_convertor::<S>().convert_to_table(ctx, input),
        }
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use futures::stream::StreamExt;

    use fluvio_future::test_async;
    use k8_storage::InMemoryStorage;
    use k8_storage::SharedStorage;
    use k8_types::options::CreateOptions;
    use k8_types::options::DeleteOptions;
    use k8_types::options::GetOptions;
    use k8_types::options::ListOptions;
    use k8_types::options::PropagationPolicy;
    use k8_types::GroupResource;
    use k8_types::K8List;
    use k8_types::K8Obj;
    use k8_types::K8Watch;
    use k8_types::ObjectMeta;

    use crate::rest::CollectionDeleter;
    use crate::rest::Creater;
    use crate::rest::DefaultUpdatedObjectInfo;
    use crate::rest::Getter;
    use crate::rest::GracefulDeleter;
    use crate::rest::Lister;
    use crate::rest::RequestContext;
    use crate::rest::TransformUpdatedObjectInfo;
    use crate::rest::Updater;
    use crate::rest::Watcher;
    use crate::test_spec::Widget;
    use crate::test_spec::WidgetSpec;
    use crate::test_spec::WidgetStrategy;
    use crate::RegistryError;
    use crate::RestOptions;
    use crate::StoreOptions;

    use super::Store;

    fn widget_store() -> Store<WidgetSpec> {
        let strategy = Arc::new(WidgetStrategy);
        Store {
            new_func: Some(Arc::new(Widget::default)),
            new_list_func: Some(Arc::new(K8List::new)),
            default_qualified_resource: GroupResource::new("test.infinyon.com", "widgets"),
            create_strategy: Some(strategy.clone()),
            update_strategy: Some(strategy.clone()),
            delete_strategy: Some(strategy),
            ..Default::default()
        }
    }

    fn store_options(storage: SharedStorage, gc: bool) -> StoreOptions {
        StoreOptions {
            rest_options: RestOptions {
                resource_prefix: "test/widgets".to_owned(),
                enable_garbage_collection: gc,
                delete_collection_workers: 2,
                storage: Some(storage),
                ..Default::default()
            },
            attr_func: None,
        }
    }

    fn completed(storage: SharedStorage) -> Store<WidgetSpec> {
        let mut store = widget_store();
        store
            .complete_with_options(&store_options(storage, true))
            .expect("complete");
        store
    }

    fn widget(name: &str, size: u16) -> Widget {
        Widget::new(name, WidgetSpec { size })
    }

    fn ctx() -> RequestContext {
        RequestContext::with_namespace("team-a")
    }

    #[test]
    fn test_complete_errors() {
        let storage = InMemoryStorage::shared();

        let mut store = widget_store();
        store.default_qualified_resource = GroupResource::default();
        let err = store
            .complete_with_options(&store_options(storage.clone(), true))
            .expect_err("resource");
        assert_eq!(
            err.to_string(),
            "store configuration error: store for Widget has an unset DefaultQualifiedResource"
        );

        let mut store = widget_store();
        store.delete_strategy = None;
        assert!(matches!(
            store.complete_with_options(&store_options(storage.clone(), true)),
            Err(RegistryError::Config(_))
        ));

        let mut store = widget_store();
        let mut options = store_options(storage, true);
        options.rest_options.resource_prefix = String::new();
        assert!(matches!(
            store.complete_with_options(&options),
            Err(RegistryError::Config(_))
        ));
    }

    #[test_async]
    async fn test_create_get() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        let created = store
            .create(&ctx(), widget("w1", 3), None, &CreateOptions::default())
            .await
            .expect("create");
        assert_eq!(created.metadata.namespace, "team-a");
        assert!(!created.metadata.uid.is_empty());
        assert!(!created.metadata.creation_timestamp.is_empty());
        assert_eq!(created.metadata.resource_version, "1");

        let fetched = store
            .get(&ctx(), "w1", &GetOptions::default())
            .await
            .expect("get");
        assert_eq!(fetched, created);

        let err = store
            .create(&ctx(), widget("w1", 3), None, &CreateOptions::default())
            .await
            .expect_err("duplicate");
        assert!(err.is_already_exists());

        let err = store
            .get(&ctx(), "w2", &GetOptions::default())
            .await
            .expect_err("missing");
        assert!(err.is_not_found());
        Ok(())
    }

    #[test_async]
    async fn test_create_invalid() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        let err = store
            .create(&ctx(), widget("w1", 0), None, &CreateOptions::default())
            .await
            .expect_err("invalid");
        assert!(err.is_invalid());
        assert_eq!(
            err.to_string(),
            "widgets.test.infinyon.com \"w1\" is invalid: [spec.size: Invalid value: must be positive]"
        );

        let validation: crate::rest::ValidateObjectFunc<WidgetSpec> =
            Arc::new(|_obj: &Widget| {
                Err::<(), _>(RegistryError::BadRequest("admission denied".to_owned()))
            });
        let err = store
            .create(&ctx(), widget("w1", 1), Some(validation), &CreateOptions::default())
            .await
            .expect_err("admission");
        assert!(matches!(err, RegistryError::BadRequest(_)));

        let dry = store
            .create(&ctx(), widget("w1", 1), None, &CreateOptions { dry_run: true })
            .await
            .expect("dry run");
        assert!(dry.metadata.resource_version.is_empty());
        let list = store
            .list(&ctx(), &ListOptions::default())
            .await
            .expect("list");
        assert!(list.is_empty());
        Ok(())
    }

    #[test_async]
    async fn test_update_conflict() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        let created = store
            .create(&ctx(), widget("w1", 3), None, &CreateOptions::default())
            .await
            .expect("create");

        let mut changed = created.clone();
        changed.spec.size = 4;
        let (updated, was_created) = store
            .update(&ctx(), "w1", &DefaultUpdatedObjectInfo::new(changed), None, None)
            .await
            .expect("update");
        assert!(!was_created);
        assert_eq!(updated.spec.size, 4);
        assert_eq!(updated.metadata.uid, created.metadata.uid);

        // still carries first resource version
        let mut stale = created.clone();
        stale.spec.size = 5;
        let err = store
            .update(&ctx(), "w1", &DefaultUpdatedObjectInfo::new(stale), None, None)
            .await
            .expect_err("conflict");
        assert!(err.is_conflict());
        Ok(())
    }

    #[test_async]
    async fn test_update_transform_and_create() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        store
            .create(&ctx(), widget("w1", 3), None, &CreateOptions::default())
            .await
            .expect("create");

        let grow = TransformUpdatedObjectInfo::new(|mut obj: Widget| {
            obj.spec.size += 1;
            obj.status.ready = true;
            Ok::<_, RegistryError>(obj)
        });
        let (updated, _) = store
            .update(&ctx(), "w1", &grow, None, None)
            .await
            .expect("update");
        assert_eq!(updated.spec.size, 4);
        // strategy keeps status
        assert!(!updated.status.ready);

        let (created, was_created) = store
            .update(
                &ctx(),
                "w2",
                &DefaultUpdatedObjectInfo::new(widget("w2", 1)),
                None,
                None,
            )
            .await
            .expect("create on update");
        assert!(was_created);
        assert_eq!(created.metadata.name, "w2");
        Ok(())
    }

    #[test_async]
    async fn test_list_selectors_and_pages() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        for (name, app) in [("w1", "shop"), ("w2", "shop"), ("w3", "blog")] {
            let mut obj = widget(name, 1);
            obj.metadata = ObjectMeta::named(name).set_labels(vec![("app", app)]);
            store
                .create(&ctx(), obj, None, &CreateOptions::default())
                .await
                .expect("create");
        }
        store
            .create(
                &RequestContext::with_namespace("team-b"),
                widget("w9", 1),
                None,
                &CreateOptions::default(),
            )
            .await
            .expect("create");

        let all = store
            .list(&ctx(), &ListOptions::default())
            .await
            .expect("list");
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.metadata.resource_version, "4");

        let everywhere = store
            .list(&RequestContext::new(), &ListOptions::default())
            .await
            .expect("list");
        assert_eq!(everywhere.items.len(), 4);

        let shop = store
            .list(
                &ctx(),
                &ListOptions {
                    label_selector: Some("app=shop".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect("list");
        let names: Vec<&str> = shop.items.iter().map(|w| w.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["w1", "w2"]);

        let single = store
            .list(
                &ctx(),
                &ListOptions {
                    field_selector: Some("metadata.name=w3".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect("list");
        assert_eq!(single.items.len(), 1);
        assert_eq!(single.items[0].metadata.name, "w3");

        let unscoped = store
            .list(
                &RequestContext::new(),
                &ListOptions {
                    field_selector: Some("metadata.name=w1".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect("list without namespace");
        assert_eq!(unscoped.items.len(), 1);
        assert_eq!(unscoped.items[0].metadata.namespace, "team-a");

        let first = store
            .list(
                &ctx(),
                &ListOptions {
                    limit: Some(2),
                    ..Default::default()
                },
            )
            .await
            .expect("page");
        assert_eq!(first.items.len(), 2);
        let token = first.metadata._continue.clone().expect("continue");
        let second = store
            .list(
                &ctx(),
                &ListOptions {
                    limit: Some(2),
                    continu: Some(token),
                    ..Default::default()
                },
            )
            .await
            .expect("page");
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].metadata.name, "w3");
        assert!(second.metadata._continue.is_none());

        let err = store
            .list(
                &ctx(),
                &ListOptions {
                    label_selector: Some("=shop".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("selector");
        assert!(matches!(err, RegistryError::Selector(_)));
        Ok(())
    }

    #[test_async]
    async fn test_delete_garbage_collection() -> Result<(), ()> {
        let storage = InMemoryStorage::shared();
        let store = completed(storage.clone());
        let owner = store
            .create(&ctx(), widget("owner", 1), None, &CreateOptions::default())
            .await
            .expect("owner");
        for name in ["d1", "d2"] {
            let mut dependent = widget(name, 1);
            dependent
                .metadata
                .owner_references
                .push(owner.metadata.make_owner_reference::<WidgetSpec>());
            store
                .create(&ctx(), dependent, None, &CreateOptions::default())
                .await
                .expect("dependent");
        }

        let (removed, immediate) = store
            .delete(&ctx(), "owner", &DeleteOptions::default())
            .await
            .expect("delete");
        assert!(immediate);
        assert_eq!(removed.metadata.name, "owner");
        let left = store
            .list(&ctx(), &ListOptions::default())
            .await
            .expect("list");
        assert!(left.is_empty());
        Ok(())
    }

    #[test_async]
    async fn test_delete_orphan_and_gc_disabled() -> Result<(), ()> {
        let storage = InMemoryStorage::shared();
        let store = completed(storage.clone());
        let owner = store
            .create(&ctx(), widget("owner", 1), None, &CreateOptions::default())
            .await
            .expect("owner");
        let mut dependent = widget("d1", 1);
        dependent
            .metadata
            .owner_references
            .push(owner.metadata.make_owner_reference::<WidgetSpec>());
        store
            .create(&ctx(), dependent, None, &CreateOptions::default())
            .await
            .expect("dependent");

        store
            .delete(
                &ctx(),
                "owner",
                &DeleteOptions::with_policy(PropagationPolicy::Orphan),
            )
            .await
            .expect("delete");
        let orphan = store
            .get(&ctx(), "d1", &GetOptions::default())
            .await
            .expect("orphan");
        assert!(orphan.metadata.owner_references.is_empty());

        let mut no_gc = widget_store();
        no_gc
            .complete_with_options(&store_options(storage, false))
            .expect("complete");
        let owner = no_gc
            .create(&ctx(), widget("owner2", 1), None, &CreateOptions::default())
            .await
            .expect("owner");
        let mut dependent = widget("d2", 1);
        dependent
            .metadata
            .owner_references
            .push(owner.metadata.make_owner_reference::<WidgetSpec>());
        no_gc
            .create(&ctx(), dependent, None, &CreateOptions::default())
            .await
            .expect("dependent");
        no_gc
            .delete(&ctx(), "owner2", &DeleteOptions::default())
            .await
            .expect("delete");
        let kept = no_gc
            .get(&ctx(), "d2", &GetOptions::default())
            .await
            .expect("kept");
        assert_eq!(kept.metadata.owner_references.len(), 1);
        Ok(())
    }

    #[test_async]
    async fn test_delete_collection() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        for name in ["w1", "w2", "w3"] {
            let mut obj = widget(name, 1);
            obj.metadata = ObjectMeta::named(name).set_labels(vec![("app", "shop")]);
            store
                .create(&ctx(), obj, None, &CreateOptions::default())
                .await
                .expect("create");
        }
        let deleted = store
            .delete_collection(
                &ctx(),
                &DeleteOptions::default(),
                &ListOptions {
                    label_selector: Some("app=shop".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect("delete collection");
        assert_eq!(deleted.items.len(), 3);
        let left = store
            .list(&ctx(), &ListOptions::default())
            .await
            .expect("list");
        assert!(left.is_empty());
        Ok(())
    }

    #[test_async]
    async fn test_watch_filtered() -> Result<(), ()> {
        let store = completed(InMemoryStorage::shared());
        let mut events = store
            .watch(
                &ctx(),
                &ListOptions {
                    label_selector: Some("app=shop".to_owned()),
                    ..Default::default()
                },
            )
            .expect("watch");

        store
            .create(&ctx(), widget("plain", 1), None, &CreateOptions::default())
            .await
            .expect("create");
        let mut labeled: K8Obj<WidgetSpec> = widget("w1", 1);
        labeled.metadata = ObjectMeta::named("w1").set_labels(vec![("app", "shop")]);
        store
            .create(&ctx(), labeled, None, &CreateOptions::default())
            .await
            .expect("create");

        match events.next().await.expect("event").expect("decoded") {
            K8Watch::ADDED(obj) => assert_eq!(obj.metadata.name, "w1"),
            other => panic!("unexpected event {:?}", other),
        }

        store.destroy();
        assert!(events.next().await.is_none());
        Ok(())
    }
}
