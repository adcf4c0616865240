//! Per-name sequence allocation.
//!
//! Sequences live in a table keyed by `name` with a `max_id` counter:
//!
//! ```sql
//! CREATE TABLE id_gen (
//!     name   VARCHAR(64) NOT NULL PRIMARY KEY,
//!     max_id BIGINT      NOT NULL DEFAULT 0
//! );
//! ```
//!
//! One `UPDATE ... last_insert_id(max_id + 1)` both bumps the counter and
//! reports the new value, so no locking is needed here.

use crate::client::Client;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Default sequence table.
pub const ID_GEN_TABLE: &str = "id_gen";

/// Allocates ids on a borrowed connection.
#[derive(Debug)]
pub struct IdGenerator<'c> {
    client: &'c mut Client,
    sql: String,
}

impl<'c> IdGenerator<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self::with_table(client, ID_GEN_TABLE)
    }

    /// Use `table` instead of `id_gen`.
    pub fn with_table(client: &'c mut Client, table: &str) -> Self {
        Self {
            client,
            sql: format!(
                "UPDATE {table} SET max_id = last_insert_id(max_id + 1) WHERE name = ?"
            ),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Next id of the sequence `name`.
    pub async fn generate_id(&mut self, name: &str) -> OrmResult<i64> {
        let result = self.client.exec(&self.sql, &[Value::from(name)]).await?;
        if result.rows_affected == 0 {
            return Err(OrmError::not_found(format!("id sequence '{name}'")));
        }
        result
            .last_insert_id
            .ok_or_else(|| OrmError::Other(format!("no id generated for sequence '{name}'")))
    }
}
