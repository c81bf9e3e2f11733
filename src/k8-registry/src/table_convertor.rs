//!
//! # Table conversion
//!
//! Turns objects into server side tables. Name and age are computed here,
//! resource specific cells are supplied by a cell function.
//!
use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde_json::Value;

use k8_types::table::Table;
use k8_types::table::TableColumnDefinition;
use k8_types::table::TableRow;
use k8_types::K8List;
use k8_types::K8Obj;
use k8_types::ListMetadata;
use k8_types::Spec;

use crate::rest::RequestContext;
use crate::rest::TableConvertor;
use crate::RegistryError;

const UNKNOWN: &str = "<unknown>";
const INVALID: &str = "<invalid>";

/// single object or list to be rendered
pub enum TableInput<'a, S: Spec> {
    Object(&'a K8Obj<S>),
    List(&'a K8List<S>),
}

impl<'a, S: Spec> TableInput<'a, S> {
    fn objects(&self) -> Vec<&'a K8Obj<S>> {
        match self {
            Self::Object(obj) => vec![*obj],
            Self::List(list) => list.items.iter().collect(),
        }
    }

    fn list_metadata(&self) -> ListMetadata {
        match self {
            Self::Object(obj) => ListMetadata {
                resource_version: obj.metadata.resource_version.clone(),
                ..Default::default()
            },
            Self::List(list) => list.metadata.clone(),
        }
    }
}

/// compact human duration: `Ns`, `Nm`, `Nh`, `Nd`, `Ny`
pub fn short_human_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds();
    if seconds < -1 {
        return INVALID.to_owned();
    }
    if seconds < 0 {
        return "0s".to_owned();
    }
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let minutes = duration.num_minutes();
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = duration.num_hours();
    if hours < 24 {
        return format!("{}h", hours);
    }
    if hours < 24 * 365 {
        return format!("{}d", hours / 24);
    }
    format!("{}y", hours / 24 / 365)
}

/// age of rfc3339 timestamp relative to given instant
pub fn translate_timestamp_at(timestamp: &str, now: DateTime<Utc>) -> String {
    if timestamp.is_empty() {
        return UNKNOWN.to_owned();
    }
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(created) => short_human_duration(now.signed_duration_since(created.with_timezone(&Utc))),
        Err(_) => UNKNOWN.to_owned(),
    }
}

pub fn translate_timestamp_since(timestamp: &str) -> String {
    translate_timestamp_at(timestamp, Utc::now())
}

/// produces cells of row from object, its name and its age
pub type CellFunc<S> =
    Arc<dyn Fn(&K8Obj<S>, &str, &str) -> Result<Vec<Value>, RegistryError> + Send + Sync>;

/// convertor with fixed columns and cell function
pub struct ColumnTableConvertor<S: Spec> {
    columns: Vec<TableColumnDefinition>,
    cells: CellFunc<S>,
}

impl<S: Spec> fmt::Debug for ColumnTableConvertor<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ColumnTableConvertor")
            .field("columns", &self.columns)
            .finish()
    }
}

impl<S: Spec> TableConvertor<S> for ColumnTableConvertor<S> {
    fn convert_to_table(
        &self,
        _ctx: &RequestContext,
        input: TableInput<'_, S>,
    ) -> Result<Table, RegistryError> {
        let mut rows = vec![];
        for obj in input.objects() {
            let age = translate_timestamp_since(&obj.metadata.creation_timestamp);
            let cells = (self.cells)(obj, &obj.metadata.name, &age)?;
            rows.push(TableRow {
                cells,
                object: Some(serde_json::to_value(obj)?),
            });
        }
        Ok(Table {
            metadata: input.list_metadata(),
            column_definitions: self.columns.clone(),
            rows,
            ..Default::default()
        })
    }
}

pub fn new_table_convertor<S, F>(
    columns: Vec<TableColumnDefinition>,
    cells: F,
) -> ColumnTableConvertor<S>
where
    S: Spec,
    F: Fn(&K8Obj<S>, &str, &str) -> Result<Vec<Value>, RegistryError> + Send + Sync + 'static,
{
    ColumnTableConvertor {
        columns,
        cells: Arc::new(cells),
    }
}

pub fn name_column() -> TableColumnDefinition {
    let mut column = TableColumnDefinition::new("Name", "string").with_format("name");
    column.description = "Name must be unique within a namespace.".to_owned();
    column
}

/// name and creation time only, used when resource has no convertor of its own
pub fn default_table_convertor<S: Spec>() -> ColumnTableConvertor<S> {
    let mut created = TableColumnDefinition::new("Created At", "date");
    created.description = "CreationTimestamp is a timestamp representing the server time when this object was created.".to_owned();
    new_table_convertor(vec![name_column(), created], |obj: &K8Obj<S>, name, _age| {
        Ok(vec![
            Value::String(name.to_owned()),
            Value::String(obj.metadata.creation_timestamp.clone()),
        ])
    })
}
