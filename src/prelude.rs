//! Convenience re-exports for common QueryHaus usage
//!
//! This prelude re-exports the most commonly used items so a single use
//! statement covers configuration, compilation and execution.
//!
//! # Example
//!
//! ```rust
//! use queryhaus::prelude::*;
//! ```

// Core QueryHaus components
pub use crate::core::QueryHaus;
pub use crate::errors::QueryHausError;

// Re-export centralized config
pub use config::{AppConfig, CompilerConfig, DatabaseConfig};

// Re-export commonly used compile-layer types
pub use sql_builder::prelude::*;

// Re-export sql_builder module for direct access
pub use sql_builder;

// Common external dependencies
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{Decode, Encode, FromRow, MySql, MySqlPool, Row, Transaction, Type};
