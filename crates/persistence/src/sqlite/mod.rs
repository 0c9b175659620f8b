//! SQLite-backed store: embedded schema and repositories.

pub mod repos;
pub mod schema;

use rusqlite::Connection;

use crate::error::PersistenceResult;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Apply the schema to a connection. Idempotent: every statement is
/// `IF NOT EXISTS` / `OR IGNORE`.
pub fn initialize(conn: &Connection) -> PersistenceResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
