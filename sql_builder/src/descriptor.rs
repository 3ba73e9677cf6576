//! Statement descriptors
//!
//! A [`QueryDescriptor`] is the structured description of one statement's
//! clauses, built incrementally by the fluent API and consumed once by the
//! compiler. The compiler never mutates it and retains nothing between
//! calls.

use serde_json::Value;

use crate::compiler::filter::FilterNode;
use crate::compiler::join::JoinSpec;
use crate::compiler::ordering::OrderBy;
use crate::compiler::pagination::{LimitSpec, PageSpec};

/// Column data for INSERT/UPDATE statements, keyed by column name.
pub type DataMap = serde_json::Map<String, Value>;

/// The SELECT field list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldList {
    /// `*`
    #[default]
    All,
    Columns(Vec<String>),
    /// `column AS alias` pairs
    Aliased(Vec<(String, String)>),
}

impl FieldList {
    /// Parse a field string; commas split into a column list, `*` or an
    /// empty string mean all columns.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == "*" {
            return FieldList::All;
        }
        if text.contains(',') {
            FieldList::Columns(text.split(',').map(|piece| piece.trim().to_string()).collect())
        } else {
            FieldList::Columns(vec![text.to_string()])
        }
    }

    /// Resolve a JSON field descriptor: string, array of columns, or a
    /// column→alias map.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => FieldList::parse(text),
            Value::Array(items) => FieldList::Columns(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::Object(map) => FieldList::Aliased(
                map.iter()
                    .filter_map(|(column, alias)| {
                        alias.as_str().map(|alias| (column.clone(), alias.to_string()))
                    })
                    .collect(),
            ),
            _ => FieldList::All,
        }
    }
}

/// One UNION arm: raw SQL or a nested descriptor compiled recursively.
#[derive(Debug, Clone, PartialEq)]
pub enum UnionQuery {
    Sql(String),
    Descriptor(Box<QueryDescriptor>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionPart {
    pub all: bool,
    pub query: UnionQuery,
}

/// The structured description of one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    /// Target table, with any prefix already applied
    pub table: Option<String>,
    pub alias: Option<String>,
    pub fields: FieldList,
    pub distinct: bool,
    pub joins: Vec<JoinSpec>,
    pub filter: Option<FilterNode>,
    pub group: Vec<String>,
    pub having: Option<String>,
    pub order: Option<OrderBy>,
    pub limit: Option<LimitSpec>,
    pub page: Option<PageSpec>,
    pub unions: Vec<UnionPart>,
    pub lock: bool,
    pub comment: Option<String>,
    /// Column names of the target table, when schema metadata is available;
    /// enables hard validation of plain filter keys
    pub known_fields: Option<Vec<String>>,
}

impl QueryDescriptor {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Default::default()
        }
    }
}

/// Statement family selector for [`crate::compiler::SqlCompiler::compile`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Select,
    Insert { data: DataMap, replace: bool },
    InsertMany { rows: Vec<DataMap>, replace: bool },
    Update { data: DataMap },
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_list_parse() {
        assert_eq!(FieldList::parse("*"), FieldList::All);
        assert_eq!(FieldList::parse(""), FieldList::All);
        assert_eq!(
            FieldList::parse("name"),
            FieldList::Columns(vec!["name".to_string()])
        );
        assert_eq!(
            FieldList::parse("name, email"),
            FieldList::Columns(vec!["name".to_string(), "email".to_string()])
        );
    }

    #[test]
    fn test_field_list_from_json_map() {
        assert_eq!(
            FieldList::from_json(&json!({"user_name": "name"})),
            FieldList::Aliased(vec![("user_name".to_string(), "name".to_string())])
        );
    }

    #[test]
    fn test_descriptor_default_is_empty() {
        let descriptor = QueryDescriptor::default();
        assert!(descriptor.table.is_none());
        assert_eq!(descriptor.fields, FieldList::All);
        assert!(!descriptor.distinct);
        assert!(descriptor.joins.is_empty());
    }
}
