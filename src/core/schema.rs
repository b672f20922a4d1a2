use std::collections::HashMap;

use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Utf8,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: DType,
    #[serde(default = "ColumnSchema::default_nullable")]
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, dtype: DType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable,
        }
    }

    pub fn default_nullable() -> bool {
        true
    }
}

/// Column layout of a tablet. Column order is significant: it is the field
/// order of every batch written to the tablet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabletSchema {
    pub id: i64,
    #[serde(default)]
    pub keys: Vec<String>,
    pub columns: Vec<ColumnSchema>,
}

impl TabletSchema {
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl From<DType> for DataType {
    fn from(dtype: DType) -> Self {
        match dtype {
            DType::Utf8 => DataType::Utf8,
            DType::Int32 => DataType::Int32,
            DType::Int64 => DataType::Int64,
            DType::Float32 => DataType::Float32,
            DType::Float64 => DataType::Float64,
            DType::Bool => DataType::Boolean,
        }
    }
}

impl From<&TabletSchema> for Schema {
    fn from(schema: &TabletSchema) -> Self {
        let fields: Vec<Field> = schema
            .columns
            .iter()
            .map(|col| Field::new(&col.name, DataType::from(col.dtype), col.nullable))
            .collect();
        let metadata = HashMap::from([
            ("schema_id".to_string(), schema.id.to_string()),
            ("keys".to_string(), schema.keys.join(",")),
        ]);
        Schema::new_with_metadata(fields, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_schema_preserves_column_order() {
        let schema = TabletSchema {
            id: 7,
            keys: vec!["k".to_string()],
            columns: vec![
                ColumnSchema::new("k", DType::Int64, false),
                ColumnSchema::new("v", DType::Utf8, true),
                ColumnSchema::new("flag", DType::Bool, true),
            ],
        };
        let arrow = Schema::from(&schema);
        let names: Vec<&str> = arrow.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["k", "v", "flag"]);
        assert_eq!(arrow.field(2).data_type(), &DataType::Boolean);
        assert!(!arrow.field(0).is_nullable());
        assert_eq!(arrow.metadata().get("schema_id").unwrap(), "7");
    }
}
