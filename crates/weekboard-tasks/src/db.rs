use rusqlite::Connection;

use crate::error::{Result, TaskError};

/// Initialise the schedule task collection `table` in `conn`.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
/// `sub_tasks` is NULL for documents written before sub-tasks existed; those
/// rows are migrated in memory on read.
pub fn init_db(conn: &Connection, table: &str) -> Result<()> {
    validate_collection(table)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id             TEXT    NOT NULL PRIMARY KEY,   -- <employeeLower>_<yyyy-MM-dd>
            employee_name  TEXT    NOT NULL,
            task_date      TEXT    NOT NULL,               -- yyyy-MM-dd
            task_content   TEXT    NOT NULL DEFAULT '',
            status         TEXT    NOT NULL DEFAULT 'pending',
            sub_tasks      TEXT,                           -- JSON array or NULL (legacy)
            is_absent      INTEGER NOT NULL DEFAULT 0,
            work_location  TEXT    NOT NULL DEFAULT 'unset',
            updated_at     TEXT    NOT NULL
        );

        -- Range reads: WHERE task_date BETWEEN ?1 AND ?2
        CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table} (task_date);"
    ))?;
    Ok(())
}

/// Collection names are interpolated into SQL, so only plain identifiers are
/// accepted: ASCII letters, digits and `_`, not starting with a digit.
pub fn validate_collection(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TaskError::InvalidCollection(name.to_string()))
    }
}
