use std::fmt;

use thiserror::Error;

use k8_config::ConfigError;
use k8_storage::StorageError;
use k8_types::selector::SelectorError;
use k8_types::GroupResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorType {
    Required,
    Invalid,
    Forbidden,
    NotSupported,
}

impl fmt::Display for FieldErrorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required value"),
            Self::Invalid => write!(f, "Invalid value"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::NotSupported => write!(f, "Unsupported value"),
        }
    }
}

/// validation failure of single field, path is dot separated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub error_type: FieldErrorType,
    pub detail: String,
}

impl FieldError {
    pub fn new<F, D>(field: F, error_type: FieldErrorType, detail: D) -> Self
    where
        F: Into<String>,
        D: Into<String>,
    {
        Self {
            field: field.into(),
            error_type,
            detail: detail.into(),
        }
    }

    pub fn required<F: Into<String>, D: Into<String>>(field: F, detail: D) -> Self {
        Self::new(field, FieldErrorType::Required, detail)
    }

    pub fn invalid<F: Into<String>, D: Into<String>>(field: F, detail: D) -> Self {
        Self::new(field, FieldErrorType::Invalid, detail)
    }

    pub fn forbidden<F: Into<String>, D: Into<String>>(field: F, detail: D) -> Self {
        Self::new(field, FieldErrorType::Forbidden, detail)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}: {}", self.field, self.error_type)
        } else {
            write!(f, "{}: {}: {}", self.field, self.error_type, self.detail)
        }
    }
}

fn join_causes(causes: &[FieldError]) -> String {
    let causes: Vec<String> = causes.iter().map(|cause| cause.to_string()).collect();
    format!("[{}]", causes.join(", "))
}

#[derive(Error, Debug)]
pub enum RegistryError {
    /// storage errors are passed through as they are
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("object is not a {expected}: {found}")]
    NotOfExpectedKind { expected: String, found: String },
    #[error("{resource} \"{name}\" is invalid: {}", join_causes(.causes))]
    Invalid {
        resource: GroupResource,
        name: String,
        causes: Vec<FieldError>,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("store configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn not_of_expected_kind<E, F>(expected: E, found: F) -> Self
    where
        E: Into<String>,
        F: Into<String>,
    {
        Self::NotOfExpectedKind {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid<N: Into<String>>(
        resource: GroupResource,
        name: N,
        causes: Vec<FieldError>,
    ) -> Self {
        Self::Invalid {
            resource,
            name: name.into(),
            causes,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_conflict())
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_already_exists())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    pub fn is_not_of_expected_kind(&self) -> bool {
        matches!(self, Self::NotOfExpectedKind { .. })
    }
}
