use tracing::trace;

use k8_registry::strategy::RestCreateStrategy;
use k8_registry::strategy::RestDeleteStrategy;
use k8_registry::strategy::RestUpdateStrategy;
use k8_registry::FieldError;
use k8_types::servicecatalog::ClusterServiceBroker;
use k8_types::servicecatalog::ClusterServiceBrokerSpec;
use k8_types::servicecatalog::ClusterServiceBrokerStatus;
use k8_types::servicecatalog::ServiceBrokerRelistBehavior;

use super::validate_cluster_service_broker;
use super::validate_cluster_service_broker_status_update;
use super::validate_cluster_service_broker_update;

/// finalizer removed by controller once broker resources are cleaned up
pub const FINALIZER_SERVICE_CATALOG: &str = "kubernetes-incubator/service-catalog";

pub const DEFAULT_RELIST_DURATION: &str = "15m0s";

/// create, update and delete behavior of brokers
#[derive(Debug, Default, Clone, Copy)]
pub struct BrokerStrategy;

impl RestCreateStrategy<ClusterServiceBrokerSpec> for BrokerStrategy {
    fn prepare_for_create(&self, broker: &mut ClusterServiceBroker) {
        broker.status = ClusterServiceBrokerStatus::default();
        if !broker
            .metadata
            .finalizers
            .iter()
            .any(|finalizer| finalizer == FINALIZER_SERVICE_CATALOG)
        {
            broker
                .metadata
                .finalizers
                .push(FINALIZER_SERVICE_CATALOG.to_owned());
        }
        broker.metadata.generation = Some(1);

        let common = &mut broker.spec.common;
        if common.relist_behavior == ServiceBrokerRelistBehavior::Duration
            && common.relist_duration.is_none()
        {
            common.relist_duration = Some(DEFAULT_RELIST_DURATION.to_owned());
        }
    }

    fn validate(&self, broker: &ClusterServiceBroker) -> Vec<FieldError> {
        validate_cluster_service_broker(broker)
    }
}

impl RestUpdateStrategy<ClusterServiceBrokerSpec> for BrokerStrategy {
    fn prepare_for_update(&self, new: &mut ClusterServiceBroker, old: &ClusterServiceBroker) {
        new.status = old.status.clone();
        if new.spec != old.spec {
            trace!(name = %new.metadata.name, "broker spec changed");
            new.metadata.generation = Some(old.metadata.generation.unwrap_or(0) + 1);
        }
    }

    fn validate_update(
        &self,
        new: &ClusterServiceBroker,
        old: &ClusterServiceBroker,
    ) -> Vec<FieldError> {
        validate_cluster_service_broker_update(new, old)
    }
}

impl RestDeleteStrategy<ClusterServiceBrokerSpec> for BrokerStrategy {}

/// how status updates treat changes to spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSpecPolicy {
    /// spec is reset to stored one
    Ignore,
    /// spec change fails validation
    Reject,
}

impl Default for StatusSpecPolicy {
    fn default() -> Self {
        Self::Ignore
    }
}

/// update behavior of status subresource, only status may change
#[derive(Debug, Default, Clone, Copy)]
pub struct BrokerStatusStrategy {
    policy: StatusSpecPolicy,
}

impl BrokerStatusStrategy {
    pub fn new(policy: StatusSpecPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StatusSpecPolicy {
        self.policy
    }
}

impl RestUpdateStrategy<ClusterServiceBrokerSpec> for BrokerStatusStrategy {
    fn prepare_for_update(&self, new: &mut ClusterServiceBroker, old: &ClusterServiceBroker) {
        if self.policy == StatusSpecPolicy::Ignore {
            new.spec = old.spec.clone();
        }
    }

    fn validate_update(
        &self,
        new: &ClusterServiceBroker,
        old: &ClusterServiceBroker,
    ) -> Vec<FieldError> {
        let mut errors = vec![];
        if new.spec != old.spec {
            errors.push(FieldError::forbidden(
                "spec",
                "spec may not be changed through the status subresource",
            ));
        }
        errors.extend(validate_cluster_service_broker_status_update(new, old));
        errors
    }
}
