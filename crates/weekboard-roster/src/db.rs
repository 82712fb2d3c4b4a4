use rusqlite::Connection;

use crate::error::{Result, RosterError};
use crate::types::RosterEmployee;

/// Map a SELECT row (column order from `SELECT_COLUMNS`) to a RosterEmployee.
pub(crate) fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<RosterEmployee> {
    use std::str::FromStr;
    let kind = weekboard_core::EmployeeKind::from_str(&row.get::<_, String>(3)?).unwrap_or_default();
    Ok(RosterEmployee {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        kind,
        order: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) const SELECT_COLUMNS: &str =
    "id, name, position, kind, sort_order, created_at, updated_at";

/// Create the roster collection `table` if needed. Idempotent.
pub fn init_db(conn: &Connection, table: &str) -> Result<()> {
    if !is_identifier(table) {
        return Err(RosterError::InvalidCollection(table.to_string()));
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id          TEXT    PRIMARY KEY NOT NULL,  -- slug of the name
            name        TEXT    NOT NULL,
            position    TEXT    NOT NULL DEFAULT '',
            kind        TEXT    NOT NULL DEFAULT 'internal',
            sort_order  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        );"
    ))?;
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
