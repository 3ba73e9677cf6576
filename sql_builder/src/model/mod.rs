//! Model execution layer
//!
//! Thin async collaborator around the compiler: schema introspection,
//! statement execution through sqlx, and result marshalling.

pub mod core;
pub mod operations;
pub mod schema;
pub mod transaction;

pub use core::Model;
pub use operations::{PageResult, ThenAdd};
pub use schema::{ColumnInfo, TableSchema};
pub use transaction::ModelTransaction;
