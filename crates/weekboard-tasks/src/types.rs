use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weekboard_core::types::employee_key;
use weekboard_core::week::format_date;

/// Progress state shared by sub-tasks and the derived document status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Click-to-advance cycle: pending -> in-progress -> completed -> pending.
    pub fn next(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Where the employee works that day. Independent of task content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkLocation {
    #[default]
    Unset,
    Office,
    Homeoffice,
}

impl std::fmt::Display for WorkLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Office => write!(f, "office"),
            Self::Homeoffice => write!(f, "homeoffice"),
        }
    }
}

impl std::str::FromStr for WorkLocation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unset" => Ok(Self::Unset),
            "office" => Ok(Self::Office),
            "homeoffice" => Ok(Self::Homeoffice),
            other => Err(format!("unknown work location: {other}")),
        }
    }
}

/// One trackable unit of work inside a day cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    /// UUIDv7 string, stable across moves.
    pub id: String,
    pub content: String,
    pub status: TaskStatus,
    /// Rank within the parent document; always `0..n-1` once persisted.
    pub order: u32,
}

/// Caller-supplied sub-task before sanitization. Every field is optional;
/// missing ones are filled in by [`crate::derive::sanitize_sub_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl SubTaskDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Lenient conversion from untyped JSON.
    ///
    /// Returns `None` when `value` is not an object. Fields of the wrong type
    /// are treated as absent rather than failing the entry: a non-string id,
    /// an unknown status, a non-numeric order.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: obj
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            content: obj.get("content").and_then(Value::as_str).map(str::to_string),
            status: obj
                .get("status")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            order: obj
                .get("order")
                .and_then(|o| o.as_i64().or_else(|| o.as_f64().map(|f| f as i64))),
        })
    }
}

impl From<SubTask> for SubTaskDraft {
    fn from(t: SubTask) -> Self {
        Self {
            id: Some(t.id),
            content: Some(t.content),
            status: Some(t.status),
            order: Some(t.order as i64),
        }
    }
}

/// Document identity: one per employee per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    /// Display name as entered; the id uses the case-normalised form.
    pub employee: String,
    pub date: NaiveDate,
}

impl TaskKey {
    pub fn new(employee: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            employee: employee.into(),
            date,
        }
    }

    /// Canonical document id: `<employeeLower>_<yyyy-MM-dd>`.
    pub fn id(&self) -> String {
        format!("{}_{}", employee_key(&self.employee), format_date(self.date))
    }

    /// True when both keys address the same stored document.
    pub fn same_document(&self, other: &TaskKey) -> bool {
        self.id() == other.id()
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id())
    }
}

/// The persisted per-employee, per-day record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTask {
    pub id: String,
    pub employee_name: String,
    pub task_date: NaiveDate,
    /// Newline-joined sub-task contents, kept for older readers. Derived.
    pub task_content: String,
    /// Aggregate of `sub_tasks`. Derived.
    pub status: TaskStatus,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default)]
    pub is_absent: bool,
    #[serde(default)]
    pub work_location: WorkLocation,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleTask {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.employee_name.clone(), self.task_date)
    }

    /// No sub-tasks and no text. May still carry absence or location.
    pub fn is_empty(&self) -> bool {
        self.sub_tasks.is_empty() && self.task_content.trim().is_empty()
    }
}

/// Published by a store after every committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    pub id: String,
    pub employee_name: String,
    pub task_date: NaiveDate,
}

impl TaskChange {
    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.task_date >= start && self.task_date <= end
    }
}

impl From<&TaskKey> for TaskChange {
    fn from(key: &TaskKey) -> Self {
        Self {
            id: key.id(),
            employee_name: key.employee.clone(),
            task_date: key.date,
        }
    }
}

/// Why a move did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Source and destination are the same document.
    SameLocation,
    /// No document exists at the source.
    SourceMissing,
    /// The source document has no sub-task with that id.
    SubTaskMissing,
}

/// Result of a move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved { sub_task: SubTask, destination: String },
    NoOp { reason: NoOpReason },
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}
