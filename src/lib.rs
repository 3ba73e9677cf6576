//! # QueryHaus
//!
//! A Rust SQL query compiler and data-access library for MySQL: describe a
//! statement as a structured filter/join/order/page descriptor and QueryHaus
//! compiles it into safely escaped SQL text, then executes it through sqlx.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use queryhaus::prelude::*;
//! use serde_json::json;
//!
//! #[derive(Debug, sqlx::FromRow)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     created_at: chrono::DateTime<chrono::Utc>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_file("queryhaus.toml")?;
//!     let haus = QueryHaus::new(config).await?;
//!
//!     let mut users = haus.model("user");
//!     let adults: Vec<User> = users
//!         .where_json(&json!({"status": 1, "age": {"gt": 18}}))
//!         .order_by("id", SortOrder::Desc)
//!         .page_with_size(1, 20)
//!         .select_as()
//!         .await?;
//!     println!("{} users", adults.len());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::QueryHaus;
pub use errors::QueryHausError;

// Re-export centralized config
pub use config::{AppConfig, CompilerConfig, DatabaseConfig};

// Re-export the compile layer
pub use sql_builder;

// Re-export external dependencies used in public API
pub use sqlx;
