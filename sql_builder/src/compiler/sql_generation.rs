//! Statement assembly
//!
//! [`SqlCompiler`] fills the fixed SELECT template with the outputs of the
//! clause sub-compilers and concatenates INSERT/UPDATE/DELETE statements
//! directly. It holds nothing but an immutable configuration; every call is
//! a pure function of its inputs.

use crate::descriptor::{
    DataMap, FieldList, QueryDescriptor, StatementKind, UnionPart, UnionQuery,
};
use crate::diagnostics::{record, Diagnostic};
use crate::errors::{CompileError, CompileResult};

use super::join::compile_joins;
use super::literal::{compile_value, quote_identifier, CompiledValue};
use super::ordering::OrderBy;
use super::pagination::resolve_limit;
use super::where_clause::compile_where;

use config::CompilerConfig;

/// The SELECT statement shape; each placeholder is resolved by the
/// correspondingly named clause compiler.
const SELECT_TEMPLATE: &str =
    "SELECT%DISTINCT% %FIELD% FROM %TABLE%%JOIN%%WHERE%%GROUP%%HAVING%%ORDER%%LIMIT%%UNION%%COMMENT%";

/// A compiled statement plus the diagnostics of any degraded predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub warnings: Vec<Diagnostic>,
}

/// The statement compiler.
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    config: CompilerConfig,
}

impl SqlCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile one statement of the given kind from a descriptor.
    pub fn compile(
        &self,
        descriptor: &QueryDescriptor,
        kind: StatementKind,
    ) -> CompileResult<CompiledSql> {
        match kind {
            StatementKind::Select => self.build_select(descriptor),
            StatementKind::Insert { data, replace } => {
                self.build_insert(&data, descriptor, replace)
            }
            StatementKind::InsertMany { rows, replace } => {
                self.build_insert_many(&rows, descriptor, replace)
            }
            StatementKind::Update { data } => self.build_update(&data, descriptor),
            StatementKind::Delete => self.build_delete(descriptor),
        }
    }

    /// Assemble a SELECT statement from the template.
    pub fn build_select(&self, descriptor: &QueryDescriptor) -> CompileResult<CompiledSql> {
        let mut warnings = Vec::new();
        let table = self.table_clause(descriptor)?;
        let sql = SELECT_TEMPLATE
            .replace("%DISTINCT%", self.distinct_clause(descriptor))
            .replace("%FIELD%", &self.field_clause(&descriptor.fields))
            .replace("%TABLE%", &table)
            .replace("%JOIN%", &self.join_clause(descriptor))
            .replace("%WHERE%", &self.where_clause(descriptor, &mut warnings)?)
            .replace("%GROUP%", &self.group_clause(&descriptor.group))
            .replace("%HAVING%", &self.having_clause(descriptor))
            .replace("%ORDER%", &self.order_clause(descriptor))
            .replace("%LIMIT%", &self.limit_clause(descriptor))
            .replace("%UNION%", &self.union_clause(descriptor, &mut warnings)?)
            .replace("%COMMENT%", &self.comment_clause(descriptor));
        let mut sql = sql.trim_end().to_string();
        if descriptor.lock {
            sql.push_str(" FOR UPDATE");
        }
        Ok(CompiledSql { sql, warnings })
    }

    /// Assemble an INSERT (or REPLACE) statement.
    pub fn build_insert(
        &self,
        data: &DataMap,
        descriptor: &QueryDescriptor,
        replace: bool,
    ) -> CompileResult<CompiledSql> {
        let mut warnings = Vec::new();
        if data.is_empty() {
            return Err(CompileError::Structural(
                "insert data is empty".to_string(),
            ));
        }
        let mut fields = Vec::new();
        let mut values = Vec::new();
        for (key, value) in data {
            match compile_value(value) {
                CompiledValue::One(token) => {
                    fields.push(quote_identifier(key));
                    values.push(token);
                }
                CompiledValue::Many(_) => {
                    record(&mut warnings, Diagnostic::SkippedValue { key: key.clone() });
                }
            }
        }
        if values.is_empty() {
            return Err(CompileError::Structural(
                "insert data has no scalar values".to_string(),
            ));
        }
        let mut sql = format!(
            "{} INTO {} ({}) VALUES ({})",
            if replace { "REPLACE" } else { "INSERT" },
            self.table_clause(descriptor)?,
            fields.join(","),
            values.join(",")
        );
        if descriptor.lock {
            sql.push_str(" FOR UPDATE");
        }
        sql.push_str(&self.comment_clause(descriptor));
        Ok(CompiledSql { sql, warnings })
    }

    /// Assemble a multi-row INSERT. The column set comes from the first
    /// row; missing cells in later rows compile as `null`.
    pub fn build_insert_many(
        &self,
        rows: &[DataMap],
        descriptor: &QueryDescriptor,
        replace: bool,
    ) -> CompileResult<CompiledSql> {
        let mut warnings = Vec::new();
        let first = rows
            .first()
            .filter(|row| !row.is_empty())
            .ok_or_else(|| CompileError::Structural("insert rows are empty".to_string()))?;
        let columns: Vec<&String> = first.keys().collect();
        let fields: Vec<String> = columns.iter().map(|key| quote_identifier(key)).collect();
        let mut value_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(columns.len());
            for key in &columns {
                let cell = row.get(*key).unwrap_or(&serde_json::Value::Null);
                match compile_value(cell) {
                    CompiledValue::One(token) => values.push(token),
                    CompiledValue::Many(_) => {
                        record(
                            &mut warnings,
                            Diagnostic::SkippedValue { key: (*key).clone() },
                        );
                        values.push("null".to_string());
                    }
                }
            }
            value_rows.push(format!("({})", values.join(",")));
        }
        let sql = format!(
            "{} INTO {} ({}) VALUES {}",
            if replace { "REPLACE" } else { "INSERT" },
            self.table_clause(descriptor)?,
            fields.join(","),
            value_rows.join(",")
        );
        Ok(CompiledSql { sql, warnings })
    }

    /// Assemble an UPDATE statement.
    pub fn build_update(
        &self,
        data: &DataMap,
        descriptor: &QueryDescriptor,
    ) -> CompileResult<CompiledSql> {
        let mut warnings = Vec::new();
        if data.is_empty() {
            return Err(CompileError::Structural(
                "update data is empty".to_string(),
            ));
        }
        let set = self.set_clause(data, &mut warnings)?;
        let sql = format!(
            "UPDATE {}{}{}{}{}{}{}",
            self.table_clause(descriptor)?,
            set,
            self.where_clause(descriptor, &mut warnings)?,
            self.order_clause(descriptor),
            self.limit_clause(descriptor),
            self.lock_clause(descriptor),
            self.comment_clause(descriptor)
        );
        Ok(CompiledSql { sql, warnings })
    }

    /// Assemble a DELETE statement.
    pub fn build_delete(&self, descriptor: &QueryDescriptor) -> CompileResult<CompiledSql> {
        let mut warnings = Vec::new();
        let sql = format!(
            "DELETE FROM {}{}{}{}{}{}",
            self.table_clause(descriptor)?,
            self.where_clause(descriptor, &mut warnings)?,
            self.order_clause(descriptor),
            self.limit_clause(descriptor),
            self.lock_clause(descriptor),
            self.comment_clause(descriptor)
        );
        Ok(CompiledSql { sql, warnings })
    }

    fn distinct_clause(&self, descriptor: &QueryDescriptor) -> &'static str {
        if descriptor.distinct {
            " DISTINCT"
        } else {
            ""
        }
    }

    /// Field list: quoted columns, `col AS alias` pairs, or `*`.
    fn field_clause(&self, fields: &FieldList) -> String {
        match fields {
            FieldList::All => "*".to_string(),
            FieldList::Columns(columns) => columns
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(","),
            FieldList::Aliased(pairs) => pairs
                .iter()
                .map(|(column, alias)| {
                    format!("{} AS {}", quote_identifier(column), quote_identifier(alias))
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Table reference; an alias turns it into a verbatim `table AS alias`
    /// fragment, a comma list quotes each table.
    fn table_clause(&self, descriptor: &QueryDescriptor) -> CompileResult<String> {
        let table = descriptor
            .table
            .as_deref()
            .filter(|table| !table.trim().is_empty())
            .ok_or_else(|| CompileError::Structural("no table given".to_string()))?;
        if let Some(alias) = &descriptor.alias {
            return Ok(format!("{} AS {}", table, alias));
        }
        Ok(table
            .split(',')
            .map(|piece| quote_identifier(piece))
            .collect::<Vec<_>>()
            .join(","))
    }

    fn join_clause(&self, descriptor: &QueryDescriptor) -> String {
        let table = descriptor.table.as_deref().unwrap_or_default();
        compile_joins(
            &descriptor.joins,
            table,
            descriptor.alias.as_deref(),
            &self.config.table_prefix,
        )
    }

    /// ` WHERE expr`, or nothing when the filter is absent or empty.
    fn where_clause(
        &self,
        descriptor: &QueryDescriptor,
        warnings: &mut Vec<Diagnostic>,
    ) -> CompileResult<String> {
        let Some(filter) = &descriptor.filter else {
            return Ok(String::new());
        };
        let expression = compile_where(filter, descriptor.known_fields.as_deref(), warnings)?;
        if expression.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", expression))
        }
    }

    /// GROUP BY columns, dot-qualified references keep their table part.
    fn group_clause(&self, group: &[String]) -> String {
        let columns: Vec<String> = group
            .iter()
            .flat_map(|piece| piece.split(','))
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|column| match column.split_once('.') {
                Some((table, column)) => format!("{}.`{}`", table, column),
                None => format!("`{}`", column),
            })
            .collect();
        if columns.is_empty() {
            String::new()
        } else {
            format!(" GROUP BY {}", columns.join(","))
        }
    }

    fn having_clause(&self, descriptor: &QueryDescriptor) -> String {
        match descriptor.having.as_deref().filter(|having| !having.is_empty()) {
            Some(having) => format!(" HAVING {}", having),
            None => String::new(),
        }
    }

    fn order_clause(&self, descriptor: &QueryDescriptor) -> String {
        let Some(order) = &descriptor.order else {
            return String::new();
        };
        let rendered = match order {
            OrderBy::Raw(text) => text.clone(),
            OrderBy::Columns(columns) => columns
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(","),
            OrderBy::Directed(pairs) => pairs
                .iter()
                .map(|(column, direction)| {
                    format!("{} {}", quote_identifier(column), direction.to_sql())
                })
                .collect::<Vec<_>>()
                .join(","),
        };
        if rendered.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", rendered)
        }
    }

    /// LIMIT from the explicit spec, falling back to page arithmetic.
    fn limit_clause(&self, descriptor: &QueryDescriptor) -> String {
        match resolve_limit(
            descriptor.limit.as_ref(),
            descriptor.page.as_ref(),
            self.config.default_page_size,
        ) {
            Some(limit) => format!(" LIMIT {}", limit.to_sql()),
            None => String::new(),
        }
    }

    /// UNION arms, each parenthesized; nested descriptors compile
    /// recursively and contribute their warnings.
    fn union_clause(
        &self,
        descriptor: &QueryDescriptor,
        warnings: &mut Vec<Diagnostic>,
    ) -> CompileResult<String> {
        let mut parts = Vec::new();
        for UnionPart { all, query } in &descriptor.unions {
            let arm = match query {
                UnionQuery::Sql(sql) => sql.trim().to_string(),
                UnionQuery::Descriptor(nested) => {
                    let compiled = self.build_select(nested)?;
                    warnings.extend(compiled.warnings);
                    compiled.sql
                }
            };
            let keyword = if *all { "UNION ALL" } else { "UNION" };
            parts.push(format!("{} ({})", keyword, arm));
        }
        if parts.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" {}", parts.join(" ")))
        }
    }

    fn comment_clause(&self, descriptor: &QueryDescriptor) -> String {
        match descriptor.comment.as_deref().filter(|comment| !comment.is_empty()) {
            Some(comment) => format!(" /* {} */", comment),
            None => String::new(),
        }
    }

    fn lock_clause(&self, descriptor: &QueryDescriptor) -> &'static str {
        if descriptor.lock {
            " FOR UPDATE"
        } else {
            ""
        }
    }

    /// ` SET \`col\`=value` pairs; values must compile to a single scalar
    /// or exp token, anything else is skipped with a diagnostic.
    fn set_clause(
        &self,
        data: &DataMap,
        warnings: &mut Vec<Diagnostic>,
    ) -> CompileResult<String> {
        let mut pairs = Vec::new();
        for (key, value) in data {
            match compile_value(value) {
                CompiledValue::One(token) => {
                    pairs.push(format!("{}={}", quote_identifier(key), token));
                }
                CompiledValue::Many(_) => {
                    record(warnings, Diagnostic::SkippedValue { key: key.clone() });
                }
            }
        }
        if pairs.is_empty() {
            return Err(CompileError::Structural(
                "update data has no scalar values".to_string(),
            ));
        }
        Ok(format!(" SET {}", pairs.join(",")))
    }
}
