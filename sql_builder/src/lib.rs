//! SQL Builder - Core compilation layer for QueryHaus
//!
//! This crate turns structured query descriptors into safely escaped MySQL
//! statements and provides the thin async model layer that executes them:
//! literal/identifier compilation, the recursive WHERE-clause compiler,
//! join construction, pagination arithmetic, statement assembly, and
//! schema-aware execution through sqlx.

pub mod compiler;
pub mod descriptor;
pub mod diagnostics;
pub mod errors;
pub mod model;
pub mod prelude;

pub use compiler::{
    Combinator, CompiledSql, CompiledValue, FilterNode, FilterValue, JoinKind, JoinOn, JoinSpec,
    LimitSpec, OrderBy, PageInfo, PageSpec, QueryBuilder, SortOrder, SqlCompiler,
};
pub use descriptor::{DataMap, FieldList, QueryDescriptor, StatementKind, UnionPart, UnionQuery};
pub use diagnostics::Diagnostic;
pub use errors::{CompileError, CompileResult, ModelError, ModelResult};
pub use model::{Model, ModelTransaction, PageResult, TableSchema, ThenAdd};

use sqlx::MySqlPool;

pub type DbPool = MySqlPool;
