//!
//! # CRD Definition
//!
//! Interface to the CRD header definition in K8 key value store
//!
use std::fmt;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Crd {
    pub group: &'static str,
    pub version: &'static str,
    pub names: CrdNames,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CrdNames {
    pub kind: &'static str,
    pub plural: &'static str,
    pub singular: &'static str,
}

/// resource name qualified by api group. resource should always be plural
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new<G, R>(group: G, resource: R) -> Self
    where
        G: Into<String>,
        R: Into<String>,
    {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_empty()
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.group.is_empty() || self.group == "core" {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}
