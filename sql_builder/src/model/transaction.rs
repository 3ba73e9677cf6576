//! Transaction support
//!
//! Wraps an sqlx transaction so multiple statements can run atomically.
//! The underlying connection is reachable through `as_mut()` for executing
//! compiled SQL inside the transaction.

use sqlx::mysql::MySqlConnection;
use sqlx::{MySql, Transaction};

use crate::errors::ModelResult;

use super::core::Model;

/// A transactional context bound to the model's pool.
pub struct ModelTransaction {
    tx: Transaction<'static, MySql>,
}

impl Model {
    /// Begin a new database transaction.
    pub async fn begin_transaction(&self) -> ModelResult<ModelTransaction> {
        let tx = self.pool().begin().await?;
        Ok(ModelTransaction { tx })
    }
}

impl ModelTransaction {
    /// Commit the transaction.
    pub async fn commit(self) -> ModelResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll the transaction back.
    pub async fn rollback(self) -> ModelResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// The underlying connection, for executing statements in-transaction.
    pub fn as_mut(&mut self) -> &mut MySqlConnection {
        &mut self.tx
    }
}
