//! `weekboard-tasks`: per-employee, per-day schedule documents with ordered
//! sub-tasks.
//!
//! # Overview
//!
//! Each [`ScheduleTask`] is keyed by `(employee, date)` and carries an ordered
//! list of [`SubTask`]s. The document's `status` and flattened `task_content`
//! are always derived from that list (see [`derive`]). Documents written before
//! sub-tasks existed are upgraded in memory on every read.
//!
//! [`ScheduleTaskManager`] is the entry point: field-owning upserts, the
//! sub-task move protocol, duplication, range queries and live subscriptions.
//! Persistence goes through the [`TaskStore`] trait; [`SqliteTaskStore`] is the
//! production implementation.
//!
//! # Move protocol
//!
//! | Step | Action                                                   |
//! |------|----------------------------------------------------------|
//! | 1    | same document? -> no-op, nothing written                 |
//! | 2    | read + migrate source, locate sub-task (absent -> no-op) |
//! | 3    | read + migrate destination, append at `max(order) + 1`   |
//! | 4    | write destination, then source                           |
//!
//! Stores without transactions apply step 4 as two writes, destination
//! first: an interruption in between duplicates the sub-task, it never loses
//! it. `SqliteTaskStore` applies both writes in one transaction.

pub mod cell;
pub mod db;
pub mod derive;
pub mod error;
pub mod manager;
pub mod stats;
pub mod store;
pub mod subscribe;
pub mod types;

pub use cell::{CellState, OptimisticCell};
pub use error::{Result, TaskError};
pub use manager::ScheduleTaskManager;
pub use stats::WeeklyStats;
pub use store::{FieldPatch, SqliteTaskStore, TaskStore};
pub use subscribe::Subscription;
pub use types::{
    MoveOutcome, NoOpReason, ScheduleTask, SubTask, SubTaskDraft, TaskChange, TaskKey, TaskStatus,
    WorkLocation,
};
