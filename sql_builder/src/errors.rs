use thiserror::Error;

/// Fatal compile failures. Degraded-but-complete compiles are not errors;
/// they surface through [`crate::diagnostics::Diagnostic`] warnings instead,
/// and callers rely on that distinction to decide whether the resulting
/// text is safe to execute.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("field `{field}` in where condition is not valid")]
    InvalidField { field: String },
}

/// Errors from the model execution layer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Operation error: {0}")]
    Operation(String),
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;
pub type ModelResult<T> = std::result::Result<T, ModelError>;
