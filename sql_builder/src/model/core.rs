//! The model handle
//!
//! A [`Model`] binds a pool to one table, accumulates per-statement options
//! through the fluent API, and resolves them into a [`QueryDescriptor`]
//! right before compilation. Options are cleared after every statement so
//! one handle can be reused, mirroring a per-call builder lifecycle.

use serde_json::Value;
use sqlx::MySqlPool;

use config::CompilerConfig;

use crate::compiler::builder::QueryBuilder;
use crate::compiler::filter::{FilterNode, FilterValue};
use crate::compiler::join::JoinSpec;
use crate::compiler::literal::quote_identifier;
use crate::compiler::ordering::{OrderBy, SortOrder};
use crate::descriptor::{DataMap, FieldList, QueryDescriptor};
use crate::errors::ModelResult;

use super::schema::TableSchema;

/// Callback applied to each data entry before insert/update; returning None
/// drops the entry.
pub type DataFilter = Box<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// Async data-access handle for one table.
pub struct Model {
    pub(crate) pool: MySqlPool,
    pub(crate) config: CompilerConfig,
    pub(crate) table_name: String,
    pub(crate) pk: String,
    pub(crate) schema: Option<TableSchema>,
    pub(crate) builder: QueryBuilder,
    pub(crate) reverse_fields: Option<Vec<String>>,
    pub(crate) pending_data: DataMap,
    pub(crate) data_filter: Option<DataFilter>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("table_name", &self.table_name)
            .field("pk", &self.pk)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}

impl Model {
    /// Bind a pool to `table`, applying the configured table prefix.
    pub fn new(pool: MySqlPool, config: CompilerConfig, table: &str) -> Self {
        let table_name = format!("{}{}", config.table_prefix, table);
        Self {
            pool,
            config,
            table_name,
            pk: "id".to_string(),
            schema: None,
            builder: QueryBuilder::new(),
            reverse_fields: None,
            pending_data: DataMap::new(),
            data_filter: None,
        }
    }

    /// Rebind to another table; cached schema is discarded.
    pub fn table(&mut self, table: &str) -> &mut Self {
        self.table_name = format!("{}{}", self.config.table_prefix, table);
        self.pk = "id".to_string();
        self.schema = None;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The primary key column (discovered from the schema once fetched).
    pub fn pk(&self) -> &str {
        &self.pk
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn update_builder(&mut self, apply: impl FnOnce(QueryBuilder) -> QueryBuilder) -> &mut Self {
        self.builder = apply(std::mem::take(&mut self.builder));
        self
    }

    pub fn alias(&mut self, alias: &str) -> &mut Self {
        self.update_builder(|builder| builder.alias(alias))
    }

    pub fn field(&mut self, fields: &str) -> &mut Self {
        self.reverse_fields = None;
        self.update_builder(|builder| builder.field(fields))
    }

    /// Select every column except the listed ones (comma-joined).
    pub fn field_reverse(&mut self, fields: &str) -> &mut Self {
        self.reverse_fields = Some(
            fields
                .split(',')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect(),
        );
        self
    }

    /// Merge a typed filter into the accumulated WHERE condition.
    pub fn filter(&mut self, filter: FilterNode) -> &mut Self {
        self.update_builder(|builder| builder.filter(filter))
    }

    /// Merge a JSON where descriptor.
    pub fn where_json(&mut self, value: &Value) -> &mut Self {
        self.update_builder(|builder| builder.where_json(value))
    }

    /// Merge a verbatim SQL condition.
    pub fn where_raw(&mut self, condition: &str) -> &mut Self {
        self.update_builder(|builder| builder.where_raw(condition))
    }

    /// Primary-key shortcut: a comma-joined value becomes an IN filter,
    /// anything else an equality.
    pub fn where_pk(&mut self, value: &Value) -> &mut Self {
        let pk = self.pk.clone();
        let node = match value.as_str() {
            Some(text) if text.contains(',') => FilterNode::predicate(
                &pk,
                FilterValue::Sequence(vec![
                    Value::String("IN".to_string()),
                    Value::String(text.to_string()),
                ]),
            ),
            _ => FilterNode::eq(&pk, value.clone()),
        };
        self.filter(node)
    }

    pub fn join(&mut self, join: JoinSpec) -> &mut Self {
        self.update_builder(|builder| builder.join(join))
    }

    pub fn join_json(&mut self, value: &Value) -> &mut Self {
        self.update_builder(|builder| builder.join_json(value))
    }

    pub fn order(&mut self, order: OrderBy) -> &mut Self {
        self.update_builder(|builder| builder.order(order))
    }

    pub fn order_by(&mut self, column: &str, direction: SortOrder) -> &mut Self {
        self.update_builder(|builder| builder.order_by(column, direction))
    }

    pub fn group(&mut self, group: &str) -> &mut Self {
        self.update_builder(|builder| builder.group(group))
    }

    pub fn having(&mut self, having: &str) -> &mut Self {
        self.update_builder(|builder| builder.having(having))
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.update_builder(|builder| builder.distinct(distinct))
    }

    pub fn limit(&mut self, count: u64) -> &mut Self {
        self.update_builder(|builder| builder.limit(count))
    }

    pub fn limit_range(&mut self, offset: u64, count: u64) -> &mut Self {
        self.update_builder(|builder| builder.limit_range(offset, count))
    }

    pub fn page(&mut self, page: u64) -> &mut Self {
        self.update_builder(|builder| builder.page(page))
    }

    pub fn page_with_size(&mut self, page: u64, size: u64) -> &mut Self {
        self.update_builder(|builder| builder.page_with_size(page, size))
    }

    pub fn union(&mut self, sql: &str, all: bool) -> &mut Self {
        self.update_builder(|builder| builder.union(sql, all))
    }

    pub fn union_query(&mut self, descriptor: QueryDescriptor, all: bool) -> &mut Self {
        self.update_builder(|builder| builder.union_query(descriptor, all))
    }

    pub fn lock(&mut self, lock: bool) -> &mut Self {
        self.update_builder(|builder| builder.lock(lock))
    }

    pub fn comment(&mut self, comment: &str) -> &mut Self {
        self.update_builder(|builder| builder.comment(comment))
    }

    /// Stage data to merge into the next insert/update.
    pub fn data(&mut self, data: DataMap) -> &mut Self {
        self.pending_data.extend(data);
        self
    }

    /// Install a per-entry data filter for the next insert/update.
    pub fn data_filter(
        &mut self,
        filter: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.data_filter = Some(Box::new(filter));
        self
    }

    /// Fetch (and cache) the table schema.
    pub async fn get_table_schema(&mut self) -> ModelResult<TableSchema> {
        self.ensure_schema().await
    }

    pub(crate) async fn ensure_schema(&mut self) -> ModelResult<TableSchema> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }
        let sql = format!("SHOW COLUMNS FROM {}", quote_identifier(&self.table_name));
        if self.config.log_sql {
            tracing::debug!(sql = %sql, "schema introspection");
        }
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let schema = TableSchema::from_show_columns(&rows)?;
        if let Some(pk) = schema.primary_key() {
            self.pk = pk.to_string();
        }
        self.schema = Some(schema.clone());
        Ok(schema)
    }

    /// Resolve the accumulated options into a descriptor and reset them.
    pub(crate) async fn parse_options(&mut self) -> ModelResult<QueryDescriptor> {
        let builder = std::mem::take(&mut self.builder);
        let reverse = self.reverse_fields.take();
        let mut descriptor = builder.into_descriptor();
        if descriptor.table.is_none() {
            descriptor.table = Some(self.table_name.clone());
        }
        let schema = self.ensure_schema().await?;
        let field_names = schema.field_names();

        // Scalar equality values are coerced to the column's storage type
        if let Some(FilterNode::Group { entries, .. }) = &mut descriptor.filter {
            for entry in entries {
                if let crate::compiler::filter::FilterEntry::Predicate {
                    key: crate::compiler::filter::FilterKey::Field(name),
                    value: FilterValue::Equals(scalar),
                } = entry
                {
                    if schema.has_column(name) {
                        *scalar = schema.coerce_value(name, scalar);
                    }
                }
            }
        }

        if let Some(excluded) = reverse {
            descriptor.fields = FieldList::Columns(
                field_names
                    .iter()
                    .filter(|field| !excluded.contains(*field))
                    .cloned()
                    .collect(),
            );
        }

        descriptor.known_fields = Some(field_names);
        Ok(descriptor)
    }

    /// Merge staged data into `data`, apply the data filter, drop unknown
    /// columns and coerce scalars against the cached schema.
    pub(crate) fn prepare_data(&mut self, data: DataMap) -> DataMap {
        let mut merged = std::mem::take(&mut self.pending_data);
        merged.extend(data);

        if let Some(filter) = self.data_filter.take() {
            let mut filtered = DataMap::new();
            for (key, value) in merged {
                if let Some(kept) = filter(&key, &value) {
                    filtered.insert(key, kept);
                }
            }
            merged = filtered;
        }

        if let Some(schema) = &self.schema {
            let mut known = DataMap::new();
            for (key, value) in merged {
                if schema.has_column(&key) {
                    let value = match value {
                        Value::Array(_) | Value::Object(_) => value,
                        scalar => schema.coerce_value(&key, &scalar),
                    };
                    known.insert(key, value);
                }
            }
            merged = known;
        }
        merged
    }
}
