//! Fluent descriptor builder
//!
//! Pool-free accumulation of a [`QueryDescriptor`]; the async model layer
//! drives one of these per statement and the compiler consumes the result.

use serde_json::Value;

use crate::descriptor::{FieldList, QueryDescriptor, UnionPart, UnionQuery};

use super::filter::FilterNode;
use super::join::JoinSpec;
use super::ordering::{OrderBy, SortOrder};
use super::pagination::{LimitSpec, PageSpec};

/// Builder for constructing query descriptors.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    descriptor: QueryDescriptor,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target table (the caller resolves any prefix).
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.descriptor.table = Some(table.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.descriptor.alias = Some(alias.into());
        self
    }

    /// Set the field list from a string (`"*"`, `"name"` or `"a,b"`).
    pub fn field(mut self, fields: &str) -> Self {
        self.descriptor.fields = FieldList::parse(fields);
        self
    }

    pub fn fields(mut self, fields: FieldList) -> Self {
        self.descriptor.fields = fields;
        self
    }

    /// Merge a filter into the accumulated WHERE condition.
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.descriptor.filter = Some(match self.descriptor.filter.take() {
            Some(existing) => existing.merge(filter),
            None => filter,
        });
        self
    }

    /// Merge a JSON where descriptor.
    pub fn where_json(self, value: &Value) -> Self {
        self.filter(FilterNode::from_json(value))
    }

    /// Merge a verbatim SQL condition.
    pub fn where_raw(self, condition: impl Into<String>) -> Self {
        self.filter(FilterNode::Raw(condition.into()))
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.descriptor.joins.push(join);
        self
    }

    /// Append join descriptors from JSON.
    pub fn join_json(mut self, value: &Value) -> Self {
        self.descriptor.joins.extend(JoinSpec::from_json(value));
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.descriptor.order = Some(order);
        self
    }

    /// Append one column to a directed ORDER BY.
    pub fn order_by(mut self, column: &str, direction: SortOrder) -> Self {
        let pair = (column.to_string(), direction);
        self.descriptor.order = Some(match self.descriptor.order.take() {
            Some(OrderBy::Directed(mut pairs)) => {
                pairs.push(pair);
                OrderBy::Directed(pairs)
            }
            _ => OrderBy::Directed(vec![pair]),
        });
        self
    }

    /// Set GROUP BY columns from a comma-joined string.
    pub fn group(mut self, group: &str) -> Self {
        self.descriptor.group = group
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.descriptor.having = Some(having.into());
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.descriptor.distinct = distinct;
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.descriptor.limit = Some(LimitSpec::Count(count));
        self
    }

    pub fn limit_range(mut self, offset: u64, count: u64) -> Self {
        self.descriptor.limit = Some(LimitSpec::OffsetCount(offset, count));
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.descriptor.page = Some(PageSpec::new(page));
        self
    }

    pub fn page_with_size(mut self, page: u64, size: u64) -> Self {
        self.descriptor.page = Some(PageSpec::with_size(page, size));
        self
    }

    /// Add a UNION arm from raw SQL.
    pub fn union(mut self, sql: impl Into<String>, all: bool) -> Self {
        self.descriptor.unions.push(UnionPart {
            all,
            query: UnionQuery::Sql(sql.into()),
        });
        self
    }

    /// Add a UNION arm compiled from a nested descriptor.
    pub fn union_query(mut self, descriptor: QueryDescriptor, all: bool) -> Self {
        self.descriptor.unions.push(UnionPart {
            all,
            query: UnionQuery::Descriptor(Box::new(descriptor)),
        });
        self
    }

    pub fn lock(mut self, lock: bool) -> Self {
        self.descriptor.lock = lock;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.descriptor.comment = Some(comment.into());
        self
    }

    /// Attach the target table's column set for hard key validation.
    pub fn known_fields(mut self, fields: Vec<String>) -> Self {
        self.descriptor.known_fields = Some(fields);
        self
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn into_descriptor(self) -> QueryDescriptor {
        self.descriptor
    }
}
