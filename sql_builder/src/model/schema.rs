//! Table schema introspection
//!
//! Column metadata read once per table via `SHOW COLUMNS`, used for hard
//! filter-key validation, primary-key discovery and value coercion.

use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::errors::{ModelError, ModelResult};

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// MySQL column type as reported, e.g. `int(11)` or `varchar(255)`
    pub column_type: String,
    pub notnull: bool,
    pub default: Option<String>,
    pub primary: bool,
    pub unique: bool,
    pub autoinc: bool,
}

/// The column set of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// Decode the rows of a `SHOW COLUMNS FROM` statement.
    pub(crate) fn from_show_columns(rows: &[MySqlRow]) -> ModelResult<Self> {
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("Field")?;
            let column_type: String = row.try_get("Type")?;
            let nullable: String = row.try_get("Null")?;
            let key: String = row.try_get("Key")?;
            let default: Option<String> = row.try_get("Default")?;
            let extra: String = row.try_get("Extra")?;
            columns.push(ColumnInfo {
                name,
                column_type,
                notnull: nullable == "NO",
                default,
                primary: key == "PRI",
                unique: key == "UNI",
                autoinc: extra.to_lowercase().contains("auto_increment"),
            });
        }
        if columns.is_empty() {
            return Err(ModelError::Operation(
                "table has no columns".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    pub fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| column.primary)
            .map(|column| column.name.as_str())
    }

    /// Coerce a scalar to the column's storage type: integer columns parse
    /// to integers (0 on failure), float columns to floats, boolean columns
    /// to truthiness. Other types pass through.
    pub fn coerce_value(&self, name: &str, value: &Value) -> Value {
        let Some(info) = self.column(name) else {
            return value.clone();
        };
        let column_type = info.column_type.to_lowercase();
        if column_type.contains("int") && !column_type.contains("bigint") {
            Value::from(as_i64(value))
        } else if column_type.contains("double") || column_type.contains("float") {
            Value::from(as_f64(value))
        } else if column_type.contains("bool") {
            Value::Bool(truthy(value))
        } else {
            value.clone()
        }
    }
}

fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|n| n as i64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema {
            columns: vec![
                ColumnInfo {
                    name: "id".to_string(),
                    column_type: "int(11)".to_string(),
                    notnull: true,
                    default: None,
                    primary: true,
                    unique: false,
                    autoinc: true,
                },
                ColumnInfo {
                    name: "score".to_string(),
                    column_type: "double".to_string(),
                    notnull: false,
                    default: None,
                    primary: false,
                    unique: false,
                    autoinc: false,
                },
                ColumnInfo {
                    name: "enabled".to_string(),
                    column_type: "bool".to_string(),
                    notnull: false,
                    default: None,
                    primary: false,
                    unique: false,
                    autoinc: false,
                },
            ],
        }
    }

    #[test]
    fn test_primary_key_discovery() {
        assert_eq!(schema().primary_key(), Some("id"));
    }

    #[test]
    fn test_coerce_int_column() {
        let schema = schema();
        assert_eq!(schema.coerce_value("id", &json!("42")), json!(42));
        assert_eq!(schema.coerce_value("id", &json!("junk")), json!(0));
    }

    #[test]
    fn test_coerce_float_and_bool() {
        let schema = schema();
        assert_eq!(schema.coerce_value("score", &json!("1.5")), json!(1.5));
        assert_eq!(schema.coerce_value("enabled", &json!("yes")), json!(true));
        assert_eq!(schema.coerce_value("enabled", &json!(0)), json!(false));
    }

    #[test]
    fn test_unknown_column_passthrough() {
        assert_eq!(schema().coerce_value("nope", &json!("x")), json!("x"));
    }
}
