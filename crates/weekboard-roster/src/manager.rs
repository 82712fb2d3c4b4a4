use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use weekboard_core::Employee;

use crate::db::{init_db, row_to_employee, SELECT_COLUMNS};
use crate::error::{Result, RosterError};
use crate::types::{RosterChange, RosterEmployee};

/// SQLite-backed roster. One row per employee, keyed by [`Employee::slug`].
pub struct RosterManager {
    db: Mutex<Connection>,
    table: String,
    changes: broadcast::Sender<RosterChange>,
}

impl RosterManager {
    pub fn new(conn: Connection, table: &str) -> Result<Self> {
        init_db(&conn, table)?;
        let (changes, _) = broadcast::channel(64);
        Ok(Self {
            db: Mutex::new(conn),
            table: table.to_string(),
            changes,
        })
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::new(Connection::open_in_memory()?, table)
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<RosterChange> {
        self.changes.subscribe()
    }

    /// All employees by `order`, then name.
    pub fn list(&self) -> Result<Vec<RosterEmployee>> {
        let db = self.db.lock().expect("roster mutex poisoned");
        let mut stmt = db.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM {} ORDER BY sort_order, name",
            self.table
        ))?;
        let rows = stmt.query_map([], row_to_employee)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Stored roster, or `defaults` when nothing has been stored yet.
    pub fn list_or_fallback(&self, defaults: &[Employee]) -> Result<Vec<Employee>> {
        let stored = self.list()?;
        if stored.is_empty() {
            debug!(count = defaults.len(), "roster empty; using defaults");
            return Ok(defaults.to_vec());
        }
        Ok(stored.iter().map(RosterEmployee::employee).collect())
    }

    pub fn get(&self, id: &str) -> Result<Option<RosterEmployee>> {
        let db = self.db.lock().expect("roster mutex poisoned");
        Ok(db
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM {} WHERE id = ?1", self.table),
                [id],
                row_to_employee,
            )
            .optional()?)
    }

    /// Create or update by slug. `created_at` survives updates; a missing
    /// `order` keeps the stored one or appends after the last row.
    #[instrument(skip(self, employee), fields(name = %employee.name))]
    pub fn save(&self, employee: &Employee, order: Option<i64>) -> Result<RosterEmployee> {
        if employee.name.trim().is_empty() {
            return Err(RosterError::Invalid("name must not be empty".into()));
        }
        let id = employee.slug();
        let now = chrono::Utc::now().to_rfc3339();
        {
            let db = self.db.lock().expect("roster mutex poisoned");
            let order = match order {
                Some(o) => o,
                None => db
                    .query_row(
                        &format!(
                            "SELECT COALESCE(
                                (SELECT sort_order FROM {t} WHERE id = ?1),
                                (SELECT MAX(sort_order) + 1 FROM {t}),
                                0)",
                            t = self.table
                        ),
                        [&id],
                        |r| r.get(0),
                    )?,
            };
            db.execute(
                &format!(
                    "INSERT INTO {} (id, name, position, kind, sort_order, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        position = excluded.position,
                        kind = excluded.kind,
                        sort_order = excluded.sort_order,
                        updated_at = excluded.updated_at",
                    self.table
                ),
                params![
                    id,
                    employee.name.trim(),
                    employee.position,
                    employee.kind.to_string(),
                    order,
                    now
                ],
            )?;
        }
        let _ = self.changes.send(RosterChange::Saved(id.clone()));
        info!(id, "employee saved");
        self.get(&id)?.ok_or(RosterError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let affected = {
            let db = self.db.lock().expect("roster mutex poisoned");
            db.execute(&format!("DELETE FROM {} WHERE id = ?1", self.table), [id])?
        };
        if affected == 0 {
            return Err(RosterError::NotFound(id.to_string()));
        }
        let _ = self.changes.send(RosterChange::Deleted(id.to_string()));
        info!(id, "employee deleted");
        Ok(())
    }

    /// Insert every default whose slug is not stored yet, with `order` set to
    /// its position in `defaults`. Existing rows are left alone. Returns the
    /// number inserted.
    #[instrument(skip(self, defaults), fields(count = defaults.len()))]
    pub fn seed_defaults(&self, defaults: &[Employee]) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut inserted = 0;
        {
            let mut db = self.db.lock().expect("roster mutex poisoned");
            let tx = db.transaction()?;
            for (i, e) in defaults.iter().enumerate() {
                inserted += tx.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {}
                         (id, name, position, kind, sort_order, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                        self.table
                    ),
                    params![e.slug(), e.name, e.position, e.kind.to_string(), i as i64, now],
                )?;
            }
            tx.commit()?;
        }
        if inserted > 0 {
            let _ = self.changes.send(RosterChange::Reordered);
            info!(inserted, "default roster seeded");
        }
        Ok(inserted)
    }

    /// Set `order` to each id's index in `ids`. All or nothing: an unknown id
    /// fails the whole call.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub fn reorder(&self, ids: &[String]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        {
            let mut db = self.db.lock().expect("roster mutex poisoned");
            let tx = db.transaction()?;
            for (i, id) in ids.iter().enumerate() {
                let n = tx.execute(
                    &format!(
                        "UPDATE {} SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                        self.table
                    ),
                    params![i as i64, now, id],
                )?;
                if n == 0 {
                    // Dropping the transaction rolls back.
                    return Err(RosterError::NotFound(id.clone()));
                }
            }
            tx.commit()?;
        }
        let _ = self.changes.send(RosterChange::Reordered);
        Ok(())
    }
}
