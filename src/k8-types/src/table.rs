//!
//! # Table output
//!
//! Server side tabular representation consumed by list formatting clients.
//!
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ListMetadata;

pub const TABLE_API_VERSION: &str = "meta.k8s.io/v1beta1";
pub const TABLE_KIND: &str = "Table";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
}

impl TableColumnDefinition {
    pub fn new<N, T>(name: N, type_: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            type_: type_.into(),
            ..Default::default()
        }
    }

    pub fn with_format<F: Into<String>>(mut self, format: F) -> Self {
        self.format = format.into();
        self
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub cells: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub api_version: String,
    pub kind: String,
    pub metadata: ListMetadata,
    pub column_definitions: Vec<TableColumnDefinition>,
    pub rows: Vec<TableRow>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            api_version: TABLE_API_VERSION.to_owned(),
            kind: TABLE_KIND.to_owned(),
            metadata: ListMetadata::default(),
            column_definitions: vec![],
            rows: vec![],
        }
    }
}

impl Table {
    /// cells of every row rendered as plain strings
    pub fn string_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| match cell {
                        Value::String(value) => value.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}
