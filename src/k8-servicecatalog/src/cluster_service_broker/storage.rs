use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use tracing::error;

use k8_registry::downcast_object;
use k8_registry::name_column;
use k8_registry::new_table_convertor;
use k8_registry::object_meta_fields_set;
use k8_registry::rest::Getter;
use k8_registry::rest::RequestContext;
use k8_registry::rest::Storage;
use k8_registry::rest::UpdatedObjectInfo;
use k8_registry::rest::Updater;
use k8_registry::rest::ValidateObjectFunc;
use k8_registry::rest::ValidateObjectUpdateFunc;
use k8_registry::ColumnTableConvertor;
use k8_registry::ObjectAttrs;
use k8_registry::Options;
use k8_registry::RegistryError;
use k8_registry::RuntimeObject;
use k8_registry::SelectionPredicate;
use k8_registry::Store;
use k8_registry::StoreOptions;
use k8_types::options::GetOptions;
use k8_types::selector::Selector;
use k8_types::selector::Set;
use k8_types::servicecatalog::ClusterServiceBroker;
use k8_types::servicecatalog::ClusterServiceBrokerList;
use k8_types::servicecatalog::ClusterServiceBrokerSpec;
use k8_types::servicecatalog::CommonServiceBrokerStatus;
use k8_types::servicecatalog::ConditionStatus;
use k8_types::table::TableColumnDefinition;
use k8_types::Spec;

use super::BrokerStatusStrategy;
use super::BrokerStrategy;
use super::StatusSpecPolicy;

pub type BrokerStore = Store<ClusterServiceBrokerSpec>;

/// shell of broker with identity, nothing else is set
pub fn new_singular(namespace: &str, name: &str) -> ClusterServiceBroker {
    let mut broker = ClusterServiceBroker::default();
    broker.kind = ClusterServiceBrokerSpec::kind();
    broker.metadata.namespace = namespace.to_owned();
    broker.metadata.name = name.to_owned();
    broker
}

pub fn empty_object() -> ClusterServiceBroker {
    ClusterServiceBroker::default()
}

pub fn new_list() -> ClusterServiceBrokerList {
    ClusterServiceBrokerList::new()
}

fn as_broker(obj: &dyn RuntimeObject) -> Result<&ClusterServiceBroker, RegistryError> {
    downcast_object::<ClusterServiceBrokerSpec>(obj).ok_or_else(|| {
        RegistryError::not_of_expected_kind(ClusterServiceBrokerSpec::kind(), obj.kind())
    })
}

/// error if object is not a broker
pub fn check_object(obj: &dyn RuntimeObject) -> Result<(), RegistryError> {
    as_broker(obj).map(|_| ())
}

/// brokers are cluster scoped, so only name is selectable
pub fn to_selectable_fields(broker: &ClusterServiceBroker) -> Set {
    object_meta_fields_set(&broker.metadata, false)
}

pub fn get_attrs(obj: &dyn RuntimeObject) -> Result<ObjectAttrs, RegistryError> {
    let broker = as_broker(obj)?;
    Ok(ObjectAttrs {
        labels: Set::from(&broker.metadata.labels),
        fields: to_selectable_fields(broker),
        uninitialized: broker.metadata.initializers.is_some(),
    })
}

pub fn match_broker(label: Selector, field: Selector) -> SelectionPredicate {
    SelectionPredicate::new(label, field, get_attrs)
}

/// condition type if latest condition holds, its reason otherwise
pub fn broker_status(status: &CommonServiceBrokerStatus) -> String {
    match status.latest_condition() {
        Some(condition) if condition.status == ConditionStatus::True => {
            condition.type_.to_string()
        }
        Some(condition) => condition.reason.clone(),
        None => "".to_owned(),
    }
}

pub fn broker_table_convertor() -> ColumnTableConvertor<ClusterServiceBrokerSpec> {
    new_table_convertor(
        vec![
            name_column(),
            TableColumnDefinition::new("URL", "string"),
            TableColumnDefinition::new("Status", "string"),
            TableColumnDefinition::new("Age", "string"),
        ],
        |broker: &ClusterServiceBroker, name, age| {
            Ok(vec![
                Value::String(name.to_owned()),
                Value::String(broker.spec.url().to_owned()),
                Value::String(broker_status(&broker.status.common)),
                Value::String(age.to_owned()),
            ])
        },
    )
}

/// broker storage and its status subresource, both backed by same storage
#[derive(Debug, Clone)]
pub struct BrokerStorage {
    pub brokers: BrokerStore,
    pub status: StatusRest,
}

pub fn new_storage(opts: &Options) -> Result<BrokerStorage, RegistryError> {
    new_storage_with_policy(opts, StatusSpecPolicy::default())
}

pub fn new_storage_with_policy(
    opts: &Options,
    policy: StatusSpecPolicy,
) -> Result<BrokerStorage, RegistryError> {
    let prefix = format!("/{}", opts.resource_prefix());
    let (storage, destroy) = opts.get_storage(&prefix);
    let strategy = Arc::new(BrokerStrategy);

    let mut store: BrokerStore = Store {
        new_func: Some(Arc::new(empty_object)),
        new_list_func: Some(Arc::new(new_list)),
        key_root_func: Some(opts.key_root_func(false)),
        key_func: Some(opts.key_func(false)),
        object_name_func: Some(Arc::new(|broker: &ClusterServiceBroker| {
            Ok::<_, RegistryError>(broker.metadata.name.clone())
        })),
        predicate_func: Some(Arc::new(match_broker)),
        default_qualified_resource: ClusterServiceBrokerSpec::group_resource(),
        create_strategy: Some(strategy.clone()),
        update_strategy: Some(strategy.clone()),
        delete_strategy: Some(strategy),
        enable_garbage_collection: true,
        table_convertor: Some(Arc::new(broker_table_convertor())),
        storage: Some(storage),
        destroy_func: Some(destroy),
        ..Default::default()
    };

    let options = StoreOptions {
        rest_options: opts.rest_options(),
        attr_func: Some(get_attrs),
    };
    if let Err(err) = store.complete_with_options(&options) {
        error!("unable to complete broker store: {}", err);
        return Err(err);
    }
    debug!(%prefix, ?policy, "broker storage ready");

    let mut status_store = store.clone();
    status_store.update_strategy = Some(Arc::new(BrokerStatusStrategy::new(policy)));

    Ok(BrokerStorage {
        brokers: store,
        status: StatusRest {
            store: status_store,
        },
    })
}

/// status subresource. only get and update are supported
#[derive(Debug, Clone)]
pub struct StatusRest {
    store: BrokerStore,
}

impl Storage<ClusterServiceBrokerSpec> for StatusRest {
    fn new_object(&self) -> ClusterServiceBroker {
        empty_object()
    }
}

#[async_trait]
impl Getter<ClusterServiceBrokerSpec> for StatusRest {
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<ClusterServiceBroker, RegistryError> {
        self.store.get(ctx, name, options).await
    }
}

#[async_trait]
impl Updater<ClusterServiceBrokerSpec> for StatusRest {
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        obj_info: &dyn UpdatedObjectInfo<ClusterServiceBrokerSpec>,
        create_validation: Option<ValidateObjectFunc<ClusterServiceBrokerSpec>>,
        update_validation: Option<ValidateObjectUpdateFunc<ClusterServiceBrokerSpec>>,
    ) -> Result<(ClusterServiceBroker, bool), RegistryError> {
        self.store
            .update(ctx, name, obj_info, create_validation, update_validation)
            .await
    }
}
