use std::time::Duration;

use chrono::DateTime;
use url::Url;

use k8_registry::strategy::spec_field;
use k8_registry::strategy::validate_dns_subdomain;
use k8_registry::FieldError;
use k8_types::servicecatalog::ClusterServiceBroker;
use k8_types::servicecatalog::ClusterServiceBrokerAuthInfo;
use k8_types::servicecatalog::CommonServiceBrokerSpec;
use k8_types::servicecatalog::CommonServiceBrokerStatus;
use k8_types::servicecatalog::ObjectReference;
use k8_types::servicecatalog::ServiceBrokerRelistBehavior;

/// go style duration such as `15m0s` or `1h30m`
pub fn parse_duration(value: &str) -> Option<Duration> {
    if value == "0" {
        return Some(Duration::ZERO);
    }
    humantime::parse_duration(value).ok()
}

fn validate_common_spec(spec: &CommonServiceBrokerSpec) -> Vec<FieldError> {
    let mut errors = vec![];

    if spec.url.is_empty() {
        errors.push(FieldError::required(
            spec_field("url"),
            "brokers must have a remote url to contact",
        ));
    } else if let Err(err) = Url::parse(&spec.url) {
        errors.push(FieldError::invalid(
            spec_field("url"),
            format!("{}: {}", spec.url, err),
        ));
    }

    if spec.insecure_skip_tls_verify && spec.ca_bundle.as_ref().map_or(false, |ca| !ca.is_empty()) {
        errors.push(FieldError::invalid(
            spec_field("caBundle"),
            "caBundle cannot be used when insecureSkipTLSVerify is true",
        ));
    }

    match (spec.relist_behavior, &spec.relist_duration) {
        (ServiceBrokerRelistBehavior::Duration, None) => errors.push(FieldError::required(
            spec_field("relistDuration"),
            "relistDuration must be set if relistBehavior is set to Duration",
        )),
        (ServiceBrokerRelistBehavior::Manual, Some(_)) => errors.push(FieldError::required(
            spec_field("relistDuration"),
            "relistDuration must not be set if relistBehavior is set to Manual",
        )),
        (ServiceBrokerRelistBehavior::Duration, Some(duration)) => match parse_duration(duration) {
            Some(parsed) if parsed > Duration::ZERO => {}
            Some(_) => errors.push(FieldError::invalid(
                spec_field("relistDuration"),
                "relistDuration must be greater than zero",
            )),
            None => errors.push(FieldError::invalid(
                spec_field("relistDuration"),
                format!("{}: invalid duration", duration),
            )),
        },
        (ServiceBrokerRelistBehavior::Manual, None) => {}
    }

    if spec.relist_requests < 0 {
        errors.push(FieldError::invalid(
            spec_field("relistRequests"),
            "relistRequests must be greater than zero",
        ));
    }

    errors
}

fn validate_secret_ref(field: &str, secret_ref: &Option<ObjectReference>) -> Vec<FieldError> {
    let mut errors = vec![];
    match secret_ref {
        None => errors.push(FieldError::required(field, "secretRef is required")),
        Some(reference) => {
            if reference.namespace.is_empty() {
                errors.push(FieldError::required(
                    format!("{}.namespace", field),
                    "namespace of secret is required",
                ));
            }
            if reference.name.is_empty() {
                errors.push(FieldError::required(
                    format!("{}.name", field),
                    "name of secret is required",
                ));
            }
        }
    }
    errors
}

fn validate_auth_info(auth_info: &Option<ClusterServiceBrokerAuthInfo>) -> Vec<FieldError> {
    let auth_info = match auth_info {
        Some(auth_info) => auth_info,
        None => return vec![],
    };
    let mut errors = vec![];
    match (&auth_info.basic, &auth_info.bearer) {
        (Some(_), Some(_)) => errors.push(FieldError::forbidden(
            spec_field("authInfo"),
            "may not specify more than 1 auth type",
        )),
        (Some(basic), None) => errors.extend(validate_secret_ref(
            &spec_field("authInfo.basic.secretRef"),
            &basic.secret_ref,
        )),
        (None, Some(bearer)) => errors.extend(validate_secret_ref(
            &spec_field("authInfo.bearer.secretRef"),
            &bearer.secret_ref,
        )),
        (None, None) => errors.push(FieldError::required(
            spec_field("authInfo"),
            "auth config is required when authInfo is set",
        )),
    }
    errors
}

fn validate_status(status: &CommonServiceBrokerStatus, generation: i64) -> Vec<FieldError> {
    let mut errors = vec![];
    if status.reconciled_generation < 0 {
        errors.push(FieldError::invalid(
            "status.reconciledGeneration",
            "must be non-negative",
        ));
    } else if status.reconciled_generation > generation {
        errors.push(FieldError::invalid(
            "status.reconciledGeneration",
            format!(
                "reconciledGeneration {} must not be greater than generation {}",
                status.reconciled_generation, generation
            ),
        ));
    }
    for (index, condition) in status.conditions.iter().enumerate() {
        let time = &condition.last_transition_time;
        if !time.is_empty() && DateTime::parse_from_rfc3339(time).is_err() {
            errors.push(FieldError::invalid(
                format!("status.conditions[{}].lastTransitionTime", index),
                format!("{}: must be an RFC 3339 timestamp", time),
            ));
        }
    }
    errors
}

pub fn validate_cluster_service_broker(broker: &ClusterServiceBroker) -> Vec<FieldError> {
    let mut errors = validate_dns_subdomain("metadata.name", &broker.metadata.name);
    if !broker.metadata.namespace.is_empty() {
        errors.push(FieldError::forbidden(
            "metadata.namespace",
            "not allowed on this type",
        ));
    }
    errors.extend(validate_common_spec(&broker.spec.common));
    errors.extend(validate_auth_info(&broker.spec.auth_info));
    errors
}

pub fn validate_cluster_service_broker_update(
    new: &ClusterServiceBroker,
    _old: &ClusterServiceBroker,
) -> Vec<FieldError> {
    validate_cluster_service_broker(new)
}

pub fn validate_cluster_service_broker_status_update(
    new: &ClusterServiceBroker,
    old: &ClusterServiceBroker,
) -> Vec<FieldError> {
    let mut errors = validate_cluster_service_broker_update(new, old);
    errors.extend(validate_status(
        &new.status.common,
        new.metadata.generation.unwrap_or(0),
    ));
    errors
}
