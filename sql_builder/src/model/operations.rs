//! Statement execution
//!
//! Every operation resolves the accumulated options, compiles a statement,
//! and hands the SQL text to sqlx. The compiler is the only thing that ever
//! builds statement text; this layer just executes and marshals results.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::compiler::filter::FilterNode;
use crate::compiler::pagination::{page_info, PageSpec};
use crate::compiler::sql_generation::{CompiledSql, SqlCompiler};
use crate::descriptor::{DataMap, FieldList, QueryDescriptor, StatementKind};
use crate::errors::{ModelError, ModelResult};

use super::core::Model;

/// Raw-SQL placeholders: `__TABLE__` becomes the bound table, any other
/// `__NAME__` becomes the lowercased name, backtick-quoted.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([A-Z_-]+)__").expect("placeholder pattern"));

/// Outcome of [`Model::then_add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThenAdd {
    /// A matching row already existed
    Existing(u64),
    /// A new row was inserted
    Created(u64),
}

impl ThenAdd {
    pub fn id(&self) -> u64 {
        match self {
            ThenAdd::Existing(id) | ThenAdd::Created(id) => *id,
        }
    }
}

/// A page of rows plus the count arithmetic that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult<T> {
    pub count: i64,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub data: Vec<T>,
}

impl Model {
    fn compiler(&self) -> SqlCompiler {
        SqlCompiler::new(self.config.clone())
    }

    fn log_sql(&self, compiled: &CompiledSql) {
        if self.config.log_sql {
            tracing::debug!(sql = %compiled.sql, "compiled statement");
        }
    }

    /// Run the accumulated query and return the raw rows.
    pub async fn select(&mut self) -> ModelResult<Vec<MySqlRow>> {
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        Ok(sqlx::query(&compiled.sql).fetch_all(&self.pool).await?)
    }

    /// Run the accumulated query, marshalling rows into `T`.
    pub async fn select_as<T>(&mut self) -> ModelResult<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        Ok(sqlx::query_as::<_, T>(&compiled.sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Fetch the first matching row.
    pub async fn find(&mut self) -> ModelResult<Option<MySqlRow>> {
        self.limit(1);
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        Ok(sqlx::query(&compiled.sql).fetch_optional(&self.pool).await?)
    }

    /// Fetch the first matching row as `T`.
    pub async fn find_as<T>(&mut self) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        self.limit(1);
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        Ok(sqlx::query_as::<_, T>(&compiled.sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Insert one row; returns the insert id (or affected rows for tables
    /// without an auto-increment key).
    pub async fn add(&mut self, data: DataMap) -> ModelResult<u64> {
        self.insert(data, false).await
    }

    /// REPLACE variant of [`Model::add`].
    pub async fn replace(&mut self, data: DataMap) -> ModelResult<u64> {
        self.insert(data, true).await
    }

    async fn insert(&mut self, data: DataMap, replace: bool) -> ModelResult<u64> {
        let descriptor = self.parse_options().await?;
        let data = self.prepare_data(data);
        let compiled = self
            .compiler()
            .compile(&descriptor, StatementKind::Insert { data, replace })?;
        self.log_sql(&compiled);
        let result = sqlx::query(&compiled.sql).execute(&self.pool).await?;
        Ok(if result.last_insert_id() != 0 {
            result.last_insert_id()
        } else {
            result.rows_affected()
        })
    }

    /// Insert many rows in one statement; returns the first insert id.
    pub async fn add_all(&mut self, rows: Vec<DataMap>) -> ModelResult<u64> {
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().compile(
            &descriptor,
            StatementKind::InsertMany {
                rows,
                replace: false,
            },
        )?;
        self.log_sql(&compiled);
        let result = sqlx::query(&compiled.sql).execute(&self.pool).await?;
        Ok(if result.last_insert_id() != 0 {
            result.last_insert_id()
        } else {
            result.rows_affected()
        })
    }

    /// Insert unless a row matching `filter` already exists.
    pub async fn then_add(&mut self, data: DataMap, filter: FilterNode) -> ModelResult<ThenAdd> {
        let pk = self.pk.clone();
        self.filter(filter);
        if let Some(row) = self.find().await? {
            let id: i64 = row
                .try_get(pk.as_str())
                .map_err(|_| ModelError::Operation(format!("primary key `{}` is not an integer", pk)))?;
            return Ok(ThenAdd::Existing(id as u64));
        }
        Ok(ThenAdd::Created(self.add(data).await?))
    }

    /// Delete matching rows; returns affected rows.
    pub async fn delete(&mut self) -> ModelResult<u64> {
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_delete(&descriptor)?;
        self.log_sql(&compiled);
        let result = sqlx::query(&compiled.sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Update matching rows; with no filter set, the primary key value is
    /// taken from the data map as the condition.
    pub async fn update(&mut self, data: DataMap) -> ModelResult<u64> {
        let mut descriptor = self.parse_options().await?;
        let mut data = self.prepare_data(data);
        let no_filter = descriptor
            .filter
            .as_ref()
            .map_or(true, FilterNode::is_empty);
        if no_filter {
            let pk = self.pk.clone();
            match data.remove(&pk) {
                Some(id) if !id.is_null() => {
                    descriptor.filter = Some(FilterNode::eq(&pk, id));
                }
                _ => {
                    return Err(ModelError::Operation(
                        "update requires a condition or a primary key value".to_string(),
                    ))
                }
            }
        }
        let compiled = self
            .compiler()
            .compile(&descriptor, StatementKind::Update { data })?;
        self.log_sql(&compiled);
        let result = sqlx::query(&compiled.sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Update a single column.
    pub async fn update_field(&mut self, field: &str, value: Value) -> ModelResult<u64> {
        let mut data = DataMap::new();
        data.insert(field.to_string(), value);
        self.update(data).await
    }

    /// Atomically increment a column.
    pub async fn update_inc(&mut self, field: &str, step: i64) -> ModelResult<u64> {
        self.update_field(field, serde_json::json!(["exp", format!("{}+{}", field, step)]))
            .await
    }

    /// Atomically decrement a column.
    pub async fn update_dec(&mut self, field: &str, step: i64) -> ModelResult<u64> {
        self.update_field(field, serde_json::json!(["exp", format!("{}-{}", field, step)]))
            .await
    }

    /// COUNT over the primary key (or the given column expression).
    pub async fn count(&mut self, field: Option<&str>) -> ModelResult<i64> {
        let field = field.unwrap_or(self.pk()).to_string();
        Ok(self
            .aggregate::<i64>("COUNT", &field)
            .await?
            .unwrap_or(0))
    }

    pub async fn sum<T>(&mut self, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.aggregate("SUM", field).await
    }

    pub async fn min<T>(&mut self, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.aggregate("MIN", field).await
    }

    pub async fn max<T>(&mut self, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.aggregate("MAX", field).await
    }

    pub async fn avg<T>(&mut self, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.aggregate("AVG", field).await
    }

    async fn aggregate<T>(&mut self, function: &str, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        let alias = function.to_lowercase();
        let expression = format!("{}({}) AS `{}`", function, field, alias);
        self.fields_override(FieldList::Columns(vec![expression]));
        self.limit(1);
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        let value: Option<Option<T>> = sqlx::query_scalar(&compiled.sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.flatten())
    }

    fn fields_override(&mut self, fields: FieldList) {
        self.builder = std::mem::take(&mut self.builder).fields(fields);
    }

    /// Column values of every matching row.
    pub async fn get_field<T>(&mut self, field: &str) -> ModelResult<Vec<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.field(field);
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        Ok(sqlx::query_scalar(&compiled.sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Column value of the first matching row.
    pub async fn get_field_one<T>(&mut self, field: &str) -> ModelResult<Option<T>>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + Unpin,
    {
        self.field(field);
        self.limit(1);
        let descriptor = self.parse_options().await?;
        let compiled = self.compiler().build_select(&descriptor)?;
        self.log_sql(&compiled);
        let value: Option<Option<T>> = sqlx::query_scalar(&compiled.sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.flatten())
    }

    /// Select a page of rows together with the total count and page
    /// arithmetic. `page_flag` controls out-of-range pages: `Some(true)`
    /// falls back to the first page, `Some(false)` to the last, `None`
    /// leaves the request untouched.
    pub async fn count_select<T>(&mut self, page_flag: Option<bool>) -> ModelResult<PageResult<T>>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let descriptor = self.parse_options().await?;
        let side = descriptor
            .alias
            .clone()
            .or_else(|| descriptor.table.clone())
            .unwrap_or_default();

        let mut count_descriptor = QueryDescriptor {
            table: descriptor.table.clone(),
            alias: descriptor.alias.clone(),
            joins: descriptor.joins.clone(),
            filter: descriptor.filter.clone(),
            known_fields: descriptor.known_fields.clone(),
            ..QueryDescriptor::default()
        };
        count_descriptor.fields = FieldList::Columns(vec![format!(
            "COUNT({}.{}) AS `count`",
            side, self.pk
        )]);
        let compiled = self.compiler().build_select(&count_descriptor)?;
        self.log_sql(&compiled);
        let count: Option<i64> = sqlx::query_scalar(&compiled.sql)
            .fetch_optional(&self.pool)
            .await?;
        let count = count.unwrap_or(0);

        let info = page_info(descriptor.page.as_ref(), self.config.default_page_size);
        let total = (count.max(0) as u64).div_ceil(info.size);
        let mut page = info.page;
        if let Some(flag) = page_flag {
            if page > total {
                page = if flag { 1 } else { total.max(1) };
            }
        }

        let mut data_descriptor = descriptor;
        data_descriptor.limit = None;
        data_descriptor.page = Some(PageSpec::with_size(page, info.size));
        let compiled = self.compiler().build_select(&data_descriptor)?;
        self.log_sql(&compiled);
        let data = sqlx::query_as::<_, T>(&compiled.sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(PageResult {
            count,
            total,
            page,
            page_size: info.size,
            data,
        })
    }

    /// Substitute `__TABLE__`-style placeholders in a raw statement.
    pub fn parse_raw_sql(&self, sql: &str) -> String {
        PLACEHOLDER
            .replace_all(sql, |caps: &regex::Captures| {
                let name = &caps[1];
                if name == "TABLE" {
                    format!("`{}`", self.table_name)
                } else {
                    format!("`{}`", name.to_lowercase())
                }
            })
            .into_owned()
    }

    /// Run a raw query after placeholder substitution.
    pub async fn query_raw(&self, sql: &str) -> ModelResult<Vec<MySqlRow>> {
        let sql = self.parse_raw_sql(sql);
        if self.config.log_sql {
            tracing::debug!(sql = %sql, "raw statement");
        }
        Ok(sqlx::query(&sql).fetch_all(&self.pool).await?)
    }

    /// Execute a raw statement after placeholder substitution; returns the
    /// insert id when one was generated, affected rows otherwise.
    pub async fn execute_raw(&self, sql: &str) -> ModelResult<u64> {
        let sql = self.parse_raw_sql(sql);
        if self.config.log_sql {
            tracing::debug!(sql = %sql, "raw statement");
        }
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(if result.last_insert_id() != 0 {
            result.last_insert_id()
        } else {
            result.rows_affected()
        })
    }
}
