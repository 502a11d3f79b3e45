//! Schema metadata that names in an expression are bound against.
//!
//! The compiler only sees the [`Schema`] trait. [`Metadata`] is a plain
//! implementation that can be loaded from JSON:
//!
//! ```json
//! {
//!   "database": { "name": "Sample", "features": ["regex", "percentile-aggregations"] },
//!   "stages": [{
//!     "fields": [
//!       { "id": 1, "name": "TOTAL", "display_name": "Total", "table": "Orders", "base_type": "type/Float" },
//!       { "name": "Profit", "base_type": "type/Float", "custom": true }
//!     ],
//!     "metrics": [{ "id": 3, "name": "Revenue" }],
//!     "segments": [{ "id": 7, "name": "Big Orders" }]
//!   }]
//! }
//! ```

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::ResolvedRef;

/// Lookup of fields, metrics and segments visible to a query stage.
pub trait Schema {
    fn field(&self, stage_index: usize, name: &str) -> Option<ResolvedRef>;
    fn metric(&self, stage_index: usize, name: &str) -> Option<ResolvedRef>;
    fn segment(&self, stage_index: usize, name: &str) -> Option<ResolvedRef>;

    /// Features supported by the database; `None` means unrestricted.
    fn database_features(&self) -> Option<&[String]> {
        None
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read metadata: {0}")]
    Io(#[from] io::Error),
    #[error("invalid metadata: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Owning table, allowing `Table → Field` references
    #[serde(default)]
    pub table: Option<String>,
    pub base_type: String,
    /// Custom column defined earlier in the stage
    #[serde(default)]
    pub custom: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub name: String,
}

impl Metadata {
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn stage(&self, stage_index: usize) -> Option<&Stage> {
        self.stages.get(stage_index)
    }
}

impl Field {
    fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    fn matches(&self, name: &str) -> bool {
        if self.label().eq_ignore_ascii_case(name) || self.name.eq_ignore_ascii_case(name) {
            return true;
        }
        // "Orders → Total"
        match (&self.table, name.split_once('→')) {
            (Some(table), Some((prefix, column))) => {
                table.eq_ignore_ascii_case(prefix.trim())
                    && self.label().eq_ignore_ascii_case(column.trim())
            }
            _ => false,
        }
    }

    fn to_ref(&self) -> ResolvedRef {
        if self.custom {
            ResolvedRef::Expression {
                name: self.name.clone(),
                base_type: self.base_type.clone(),
            }
        } else {
            ResolvedRef::Field {
                id: self.id,
                base_type: self.base_type.clone(),
            }
        }
    }
}

impl Schema for Metadata {
    fn field(&self, stage_index: usize, name: &str) -> Option<ResolvedRef> {
        self.stage(stage_index)?
            .fields
            .iter()
            .find(|f| f.matches(name))
            .map(Field::to_ref)
    }

    fn metric(&self, stage_index: usize, name: &str) -> Option<ResolvedRef> {
        self.stage(stage_index)?
            .metrics
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| ResolvedRef::Metric(m.id))
    }

    fn segment(&self, stage_index: usize, name: &str) -> Option<ResolvedRef> {
        self.stage(stage_index)?
            .segments
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| ResolvedRef::Segment(s.id))
    }

    fn database_features(&self) -> Option<&[String]> {
        self.database.features.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "stages": [{
            "fields": [
                { "id": 1, "name": "TOTAL", "display_name": "Total", "table": "Orders", "base_type": "type/Float" },
                { "name": "Profit", "base_type": "type/Float", "custom": true }
            ],
            "metrics": [{ "id": 3, "name": "Revenue" }],
            "segments": [{ "id": 7, "name": "Big Orders" }]
        }]
    }"#;

    #[test]
    fn finds_fields_by_display_name_and_table_prefix() {
        let metadata = Metadata::from_json(SAMPLE).unwrap();
        let total = ResolvedRef::Field {
            id: 1,
            base_type: "type/Float".into(),
        };
        assert_eq!(metadata.field(0, "total"), Some(total.clone()));
        assert_eq!(metadata.field(0, "Orders → Total"), Some(total));
        assert_eq!(metadata.field(0, "People → Total"), None);
        assert_eq!(metadata.field(1, "Total"), None);
    }

    #[test]
    fn custom_columns_bind_as_expressions() {
        let metadata = Metadata::from_json(SAMPLE).unwrap();
        assert!(matches!(
            metadata.field(0, "Profit"),
            Some(ResolvedRef::Expression { name, .. }) if name == "Profit"
        ));
    }

    #[test]
    fn metrics_and_segments() {
        let metadata = Metadata::from_json(SAMPLE).unwrap();
        assert_eq!(metadata.metric(0, "revenue"), Some(ResolvedRef::Metric(3)));
        assert_eq!(metadata.segment(0, "Big Orders"), Some(ResolvedRef::Segment(7)));
        assert_eq!(metadata.database_features(), None);
    }
}
