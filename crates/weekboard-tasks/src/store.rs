use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use weekboard_core::week::{format_date, DATE_FORMAT};

use crate::db::init_db;
use crate::derive::{calculate_overall_status, flatten_content, sanitize_sub_tasks};
use crate::error::{Result, TaskError};
use crate::types::{ScheduleTask, SubTask, SubTaskDraft, TaskChange, TaskKey, TaskStatus, WorkLocation};

const CHANGE_CAPACITY: usize = 256;

/// The set of fields one write owns. A write only ever overwrites its own
/// fields (plus `updated_at`); every other field of an existing document is
/// preserved, and a missing document is created with defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch {
    /// Flattened text only (pre-sub-task writers).
    Content(String),
    /// Aggregate status only (pre-sub-task writers).
    Status(TaskStatus),
    Absence(bool),
    Location(WorkLocation),
    /// Sub-tasks together with the fields derived from them.
    SubTasks {
        sub_tasks: Vec<SubTask>,
        task_content: String,
        status: TaskStatus,
    },
}

impl FieldPatch {
    /// Sub-task patch with `task_content` and `status` derived from `sub_tasks`.
    pub fn sub_tasks(sub_tasks: Vec<SubTask>) -> Self {
        FieldPatch::SubTasks {
            task_content: flatten_content(&sub_tasks),
            status: calculate_overall_status(&sub_tasks),
            sub_tasks,
        }
    }

    fn assignments(&self) -> &'static str {
        match self {
            FieldPatch::Content(_) => "task_content = excluded.task_content",
            FieldPatch::Status(_) => "status = excluded.status",
            FieldPatch::Absence(_) => "is_absent = excluded.is_absent",
            FieldPatch::Location(_) => "work_location = excluded.work_location",
            FieldPatch::SubTasks { .. } => {
                "task_content = excluded.task_content,
                 status = excluded.status,
                 sub_tasks = excluded.sub_tasks"
            }
        }
    }
}

/// Document store consumed by [`crate::ScheduleTaskManager`].
///
/// `get` and `query_range` return documents exactly as stored; legacy
/// migration is the manager's job.
pub trait TaskStore: Send + Sync + 'static {
    fn get(&self, key: &TaskKey) -> Result<Option<ScheduleTask>>;

    /// Documents with `start <= task_date <= end`, in no particular order.
    fn query_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScheduleTask>>;

    /// Update-or-create `key`, touching only the fields `patch` owns.
    /// Either the whole patch is applied or the call fails.
    fn upsert(&self, key: &TaskKey, patch: &FieldPatch) -> Result<()>;

    /// Apply several patches in the given order.
    ///
    /// The default issues them one by one and stops at the first failure, so
    /// earlier writes stay committed. Stores with transactions should
    /// override this to apply all or nothing.
    fn upsert_many(&self, writes: &[(TaskKey, FieldPatch)]) -> Result<()> {
        for (key, patch) in writes {
            self.upsert(key, patch)?;
        }
        Ok(())
    }

    /// Receive a [`TaskChange`] after every committed write.
    fn subscribe_changes(&self) -> broadcast::Receiver<TaskChange>;
}

/// SQLite-backed [`TaskStore`]: one table per collection.
///
/// Wraps a single connection in a `Mutex`, same as the other managers; writes
/// are serialised in-process and each upsert is a single statement.
pub struct SqliteTaskStore {
    db: Mutex<Connection>,
    table: String,
    changes: broadcast::Sender<TaskChange>,
}

impl SqliteTaskStore {
    /// Wrap `conn`, creating the `table` collection if needed.
    pub fn new(conn: Connection, table: &str) -> Result<Self> {
        init_db(&conn, table)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            db: Mutex::new(conn),
            table: table.to_string(),
            changes,
        })
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::new(Connection::open_in_memory()?, table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Store a document in the pre-sub-task shape (`sub_tasks` NULL).
    /// Used by imports of old data and by tests of the migration path.
    pub fn insert_legacy(
        &self,
        key: &TaskKey,
        task_content: &str,
        status: TaskStatus,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().expect("task store mutex poisoned");
        db.execute(
            &format!(
                "INSERT OR REPLACE INTO {}
                 (id, employee_name, task_date, task_content, status, sub_tasks,
                  is_absent, work_location, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, 'unset', ?6)",
                self.table
            ),
            rusqlite::params![
                key.id(),
                key.employee,
                format_date(key.date),
                task_content,
                status.to_string(),
                now
            ],
        )?;
        drop(db);
        self.notify(key);
        Ok(())
    }

    fn notify(&self, key: &TaskKey) {
        // No receivers is fine: nobody is watching.
        let _ = self.changes.send(TaskChange::from(key));
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT id, employee_name, task_date, task_content, status, sub_tasks,
                    is_absent, work_location, updated_at
             FROM {}",
            self.table
        )
    }
}

impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self), fields(id = %key))]
    fn get(&self, key: &TaskKey) -> Result<Option<ScheduleTask>> {
        let db = self.db.lock().expect("task store mutex poisoned");
        match db.query_row(
            &format!("{} WHERE id = ?1", self.select_sql()),
            [key.id()],
            row_to_task,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TaskError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    fn query_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScheduleTask>> {
        let db = self.db.lock().expect("task store mutex poisoned");
        // Single-column range on ISO strings: lexicographic == chronological.
        let mut stmt = db.prepare_cached(&format!(
            "{} WHERE task_date >= ?1 AND task_date <= ?2",
            self.select_sql()
        ))?;
        let rows = stmt.query_map([format_date(start), format_date(end)], row_to_task)?;
        let tasks: Vec<ScheduleTask> = rows
            .filter_map(|r| match r {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(table = %self.table, "skipping unreadable row: {e}");
                    None
                }
            })
            .collect();
        debug!(count = tasks.len(), "range query");
        Ok(tasks)
    }

    #[instrument(skip(self, patch), fields(id = %key))]
    fn upsert(&self, key: &TaskKey, patch: &FieldPatch) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().expect("task store mutex poisoned");
        write_patch(&db, &self.table, key, patch, &now)?;
        drop(db);
        self.notify(key);
        Ok(())
    }

    /// All patches in one transaction: either every document is written or
    /// none is.
    #[instrument(skip(self, writes), fields(count = writes.len()))]
    fn upsert_many(&self, writes: &[(TaskKey, FieldPatch)]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut db = self.db.lock().expect("task store mutex poisoned");
        let tx = db.transaction()?;
        for (key, patch) in writes {
            write_patch(&tx, &self.table, key, patch, &now)?;
        }
        tx.commit()?;
        drop(db);
        for (key, _) in writes {
            self.notify(key);
        }
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }
}

/// One conditional upsert. On insert every column gets the patch value or
/// its default; on conflict only the patch's own columns are assigned.
fn write_patch(
    conn: &Connection,
    table: &str,
    key: &TaskKey,
    patch: &FieldPatch,
    now: &str,
) -> Result<()> {
    let mut content = String::new();
    let mut status = TaskStatus::Pending;
    let mut sub_tasks_json = "[]".to_string();
    let mut is_absent = false;
    let mut location = WorkLocation::Unset;

    match patch {
        FieldPatch::Content(c) => content = c.clone(),
        FieldPatch::Status(s) => status = *s,
        FieldPatch::Absence(a) => is_absent = *a,
        FieldPatch::Location(l) => location = *l,
        FieldPatch::SubTasks {
            sub_tasks,
            task_content,
            status: s,
        } => {
            sub_tasks_json = serde_json::to_string(sub_tasks)?;
            content = task_content.clone();
            status = *s;
        }
    }

    conn.execute(
        &format!(
            "INSERT INTO {table}
             (id, employee_name, task_date, task_content, status, sub_tasks,
              is_absent, work_location, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                {}, updated_at = excluded.updated_at",
            patch.assignments()
        ),
        rusqlite::params![
            key.id(),
            key.employee,
            format_date(key.date),
            content,
            status.to_string(),
            sub_tasks_json,
            is_absent as i64,
            location.to_string(),
            now,
        ],
    )?;
    debug!(id = %key, "document written");
    Ok(())
}

/// Map a SELECT row (column order from `select_sql`) to a `ScheduleTask`.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleTask> {
    let date_str: String = row.get(2)?;
    let task_date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let updated_str: String = row.get(8)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ScheduleTask {
        id: row.get(0)?,
        employee_name: row.get(1)?,
        task_date,
        task_content: row.get(3)?,
        status: row.get::<_, String>(4)?.parse().unwrap_or_default(),
        sub_tasks: parse_stored_sub_tasks(row.get::<_, Option<String>>(5)?.as_deref()),
        is_absent: row.get::<_, i64>(6)? != 0,
        work_location: row.get::<_, String>(7)?.parse().unwrap_or_default(),
        updated_at,
    })
}

/// Decode the stored JSON list leniently. NULL (legacy) and unparseable
/// values read as an empty list; malformed entries are dropped or filled in
/// the same way a save would.
fn parse_stored_sub_tasks(raw: Option<&str>) -> Vec<SubTask> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => sanitize_sub_tasks(items.iter().filter_map(SubTaskDraft::from_value)),
        Ok(_) | Err(_) => {
            warn!("stored sub_tasks is not a JSON array; reading as empty");
            Vec::new()
        }
    }
}
