use std::fmt;
use std::sync::Arc;

use k8_types::selector::Selector;
use k8_types::selector::Set;
use k8_types::ObjectMeta;

use crate::RegistryError;
use crate::RuntimeObject;

pub const FIELD_NAME: &str = "metadata.name";
pub const FIELD_NAMESPACE: &str = "metadata.namespace";

/// attributes of object used for selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectAttrs {
    pub labels: Set,
    pub fields: Set,
    /// legacy admission flag, object still has pending initializers
    pub uninitialized: bool,
}

pub type AttrFunc = fn(&dyn RuntimeObject) -> Result<ObjectAttrs, RegistryError>;

pub type PredicateFunc = Arc<dyn Fn(Selector, Selector) -> SelectionPredicate + Send + Sync>;

/// label and field selector which must both match
#[derive(Clone)]
pub struct SelectionPredicate {
    pub label: Selector,
    pub field: Selector,
    pub get_attrs: AttrFunc,
}

impl fmt::Debug for SelectionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SelectionPredicate")
            .field("label", &self.label.to_string())
            .field("field", &self.field.to_string())
            .finish()
    }
}

impl SelectionPredicate {
    pub fn new(label: Selector, field: Selector, get_attrs: AttrFunc) -> Self {
        Self {
            label,
            field,
            get_attrs,
        }
    }

    /// true if predicate matches everything
    pub fn is_empty(&self) -> bool {
        self.label.is_empty() && self.field.is_empty()
    }

    pub fn matches(&self, obj: &dyn RuntimeObject) -> Result<bool, RegistryError> {
        if self.is_empty() {
            return Ok(true);
        }
        let attrs = (self.get_attrs)(obj)?;
        Ok(self.label.matches(&attrs.labels) && self.field.matches(&attrs.fields))
    }

    /// name if field selector pins a single object
    pub fn matches_single(&self) -> Option<&str> {
        self.field.requires_exact(FIELD_NAME)
    }
}

/// predicate func building predicates around attr func
pub fn predicate_with_attrs(get_attrs: AttrFunc) -> PredicateFunc {
    Arc::new(move |label, field| SelectionPredicate::new(label, field, get_attrs))
}

/// standard metadata fields an object can be selected by
pub fn object_meta_fields_set(meta: &ObjectMeta, has_namespace_field: bool) -> Set {
    let mut fields = Set::new();
    fields.insert(FIELD_NAME, meta.name.clone());
    if has_namespace_field {
        fields.insert(FIELD_NAMESPACE, meta.namespace.clone());
    }
    fields
}

fn default_attrs(obj: &dyn RuntimeObject, namespaced: bool) -> Result<ObjectAttrs, RegistryError> {
    let meta = obj
        .object_meta()
        .ok_or_else(|| RegistryError::BadRequest(format!("{} has no object metadata", obj.kind())))?;
    Ok(ObjectAttrs {
        labels: Set::from(&meta.labels),
        fields: object_meta_fields_set(meta, namespaced),
        uninitialized: meta.initializers.is_some(),
    })
}

pub fn default_namespace_scoped_attr(obj: &dyn RuntimeObject) -> Result<ObjectAttrs, RegistryError> {
    default_attrs(obj, true)
}

pub fn default_cluster_scoped_attr(obj: &dyn RuntimeObject) -> Result<ObjectAttrs, RegistryError> {
    default_attrs(obj, false)
}
