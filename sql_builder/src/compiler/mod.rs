//! The SQL compiler
//!
//! Leaves first: literal/identifier compilation, the filter type model and
//! its recursive WHERE compiler, join compilation, pagination arithmetic,
//! and the clause assembler that produces complete statements.

pub mod builder;
pub mod filter;
pub mod join;
pub mod literal;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod where_clause;


#[cfg(test)]
mod integration_tests;

pub use builder::QueryBuilder;
pub use filter::{Combinator, CompoundKey, FilterEntry, FilterKey, FilterNode, FilterValue, SpecialKey};
pub use join::{JoinKind, JoinOn, JoinSpec};
pub use literal::{compile_scalar, compile_value, escape_string, quote_identifier, CompiledValue};
pub use ordering::{OrderBy, SortOrder};
pub use pagination::{page_info, resolve_limit, LimitSpec, PageInfo, PageSpec};
pub use sql_generation::{CompiledSql, SqlCompiler};
pub use where_clause::compile_where;
