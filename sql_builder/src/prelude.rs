//! Convenience re-exports for the common surface.

pub use crate::compiler::{
    Combinator, CompiledSql, FilterNode, FilterValue, JoinKind, JoinSpec, LimitSpec, OrderBy,
    PageSpec, QueryBuilder, SortOrder, SqlCompiler,
};
pub use crate::descriptor::{DataMap, FieldList, QueryDescriptor, StatementKind};
pub use crate::diagnostics::Diagnostic;
pub use crate::errors::{CompileError, CompileResult, ModelError, ModelResult};
pub use crate::model::{Model, ModelTransaction, PageResult, TableSchema, ThenAdd};
