//!
//! # Strategies
//!
//! Per resource behavior plugged into the generic store.
//!
use k8_types::K8Obj;
use k8_types::Spec;

use crate::FieldError;

pub trait RestCreateStrategy<S: Spec>: Send + Sync {
    fn namespace_scoped(&self) -> bool {
        S::NAME_SPACED
    }

    /// clear fields that are not allowed to be set by user
    fn prepare_for_create(&self, obj: &mut K8Obj<S>);

    fn validate(&self, obj: &K8Obj<S>) -> Vec<FieldError>;

    /// normalize object before it is stored
    fn canonicalize(&self, _obj: &mut K8Obj<S>) {}
}

pub trait RestUpdateStrategy<S: Spec>: Send + Sync {
    fn namespace_scoped(&self) -> bool {
        S::NAME_SPACED
    }

    fn allow_create_on_update(&self) -> bool {
        false
    }

    /// if false, update must carry resource version
    fn allow_unconditional_update(&self) -> bool {
        true
    }

    fn prepare_for_update(&self, obj: &mut K8Obj<S>, old: &K8Obj<S>);

    fn validate_update(&self, obj: &K8Obj<S>, old: &K8Obj<S>) -> Vec<FieldError>;

    fn canonicalize(&self, _obj: &mut K8Obj<S>) {}
}

pub trait RestDeleteStrategy<S: Spec>: Send + Sync {
    fn namespace_scoped(&self) -> bool {
        S::NAME_SPACED
    }
}

/// path of field inside spec
pub fn spec_field(path: &str) -> String {
    if path.is_empty() {
        "spec".to_owned()
    } else {
        format!("spec.{}", path)
    }
}

/// rfc 1123 subdomain, used for object names
pub fn validate_dns_subdomain(field: &str, name: &str) -> Vec<FieldError> {
    const MAX_LEN: usize = 253;

    let mut errors = vec![];
    if name.is_empty() {
        errors.push(FieldError::required(field, "name or generateName is required"));
        return errors;
    }
    if name.len() > MAX_LEN {
        errors.push(FieldError::invalid(
            field,
            format!("must be no more than {} characters", MAX_LEN),
        ));
    }
    let label_ok = |label: &str| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    };
    if !name.split('.').all(label_ok) {
        errors.push(FieldError::invalid(
            field,
            format!(
                "{}: a DNS-1123 subdomain must consist of lower case alphanumeric characters, '-' or '.'",
                name
            ),
        ));
    }
    errors
}
