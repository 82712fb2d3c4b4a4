use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use weekboard_core::week::next_day;

use crate::derive::{
    generate_sub_task_id, migrate_task_to_sub_tasks, next_order, resequence, sanitize_sub_tasks,
};
use crate::error::{Result, TaskError};
use crate::store::{FieldPatch, TaskStore};
use crate::types::{
    MoveOutcome, NoOpReason, ScheduleTask, SubTask, SubTaskDraft, TaskKey, TaskStatus,
    WorkLocation,
};

/// Invariant-preserving operations over schedule task documents.
///
/// Every write goes through [`TaskStore::upsert`] with a [`FieldPatch`] that
/// names exactly the fields the operation owns, so e.g. toggling absence never
/// clobbers a concurrent sub-task edit. Reads always return migrated
/// documents.
pub struct ScheduleTaskManager<S: TaskStore> {
    store: Arc<S>,
}

impl<S: TaskStore> Clone for ScheduleTaskManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TaskStore> ScheduleTaskManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // --- reads -------------------------------------------------------------

    /// The document for `employee` on `date`, migrated, or `None`.
    pub fn get(&self, employee: &str, date: NaiveDate) -> Result<Option<ScheduleTask>> {
        Ok(self
            .store
            .get(&TaskKey::new(employee, date))?
            .map(migrate_task_to_sub_tasks))
    }

    /// All documents in `[start, end]`, migrated and sorted by
    /// `(task_date, employee_name)`.
    pub fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScheduleTask>> {
        load_range(self.store.as_ref(), start, end)
    }

    // --- field-owning writes ----------------------------------------------

    /// Set the flattened text only. Status and sub-tasks are left alone.
    #[instrument(skip(self, text))]
    pub fn save_text_content(&self, employee: &str, date: NaiveDate, text: &str) -> Result<()> {
        self.store.upsert(
            &TaskKey::new(employee, date),
            &FieldPatch::Content(text.to_string()),
        )
    }

    /// Set the aggregate status only; for documents without sub-tasks.
    #[instrument(skip(self))]
    pub fn set_status(&self, employee: &str, date: NaiveDate, status: TaskStatus) -> Result<()> {
        self.store
            .upsert(&TaskKey::new(employee, date), &FieldPatch::Status(status))
    }

    #[instrument(skip(self))]
    pub fn toggle_absence(&self, employee: &str, date: NaiveDate, absent: bool) -> Result<()> {
        self.store
            .upsert(&TaskKey::new(employee, date), &FieldPatch::Absence(absent))
    }

    #[instrument(skip(self))]
    pub fn set_work_location(
        &self,
        employee: &str,
        date: NaiveDate,
        location: WorkLocation,
    ) -> Result<()> {
        self.store
            .upsert(&TaskKey::new(employee, date), &FieldPatch::Location(location))
    }

    /// Replace the sub-task list.
    ///
    /// Input is sanitized (see [`sanitize_sub_tasks`]) and entries with blank
    /// content are dropped; then sub-tasks, flattened content and aggregate
    /// status are written in one upsert. Returns the list as persisted.
    #[instrument(skip(self, sub_tasks))]
    pub fn save_sub_tasks<I, D>(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_tasks: I,
    ) -> Result<Vec<SubTask>>
    where
        I: IntoIterator<Item = D>,
        D: Into<SubTaskDraft>,
    {
        let mut clean = sanitize_sub_tasks(sub_tasks);
        clean.retain(|t| !t.content.is_empty());
        resequence(&mut clean);
        self.store.upsert(
            &TaskKey::new(employee, date),
            &FieldPatch::sub_tasks(clean.clone()),
        )?;
        debug!(count = clean.len(), "sub-tasks saved");
        Ok(clean)
    }

    /// Change one sub-task's status.
    ///
    /// Returns `false` without writing when the document or the sub-task
    /// does not exist.
    #[instrument(skip(self))]
    pub fn set_sub_task_status(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_task_id: &str,
        status: TaskStatus,
    ) -> Result<bool> {
        let Some(doc) = self.get(employee, date)? else {
            debug!("no document; nothing to update");
            return Ok(false);
        };
        let mut sub_tasks = doc.sub_tasks;
        let Some(target) = sub_tasks.iter_mut().find(|t| t.id == sub_task_id) else {
            debug!("sub-task not found; nothing to update");
            return Ok(false);
        };
        target.status = status;
        self.save_sub_tasks(employee, date, sub_tasks)?;
        Ok(true)
    }

    /// Append a sub-task after the existing ones (creating the document if
    /// needed). Returns the sub-task as persisted.
    ///
    /// A supplied id already present in the cell is replaced by a fresh one.
    /// Blank content is rejected with [`TaskError::InvalidInput`].
    #[instrument(skip(self, sub_task))]
    pub fn add_sub_task_to_employee(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_task: SubTaskDraft,
    ) -> Result<SubTask> {
        if sub_task.content.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(TaskError::InvalidInput("sub-task content is blank".into()));
        }
        let mut list: Vec<SubTaskDraft> = Vec::new();
        let mut order = 0;
        if let Some(doc) = self.get(employee, date)? {
            order = next_order(&doc.sub_tasks);
            list.extend(doc.sub_tasks.into_iter().map(SubTaskDraft::from));
        }
        let id = match sub_task.id.clone() {
            Some(id) if !list.iter().any(|t| t.id.as_deref() == Some(id.as_str())) => id,
            _ => generate_sub_task_id(),
        };
        list.push(SubTaskDraft {
            id: Some(id.clone()),
            order: Some(order as i64),
            ..sub_task
        });

        let saved = self.save_sub_tasks(employee, date, list)?;
        // Present by construction: content is non-blank and the id unique.
        let added = saved
            .into_iter()
            .find(|t| t.id == id)
            .unwrap_or_else(|| SubTask {
                id,
                content: String::new(),
                status: TaskStatus::Pending,
                order,
            });
        Ok(added)
    }

    // --- move protocol -----------------------------------------------------

    /// Move a sub-task to another day of the same employee.
    pub fn move_sub_task(
        &self,
        employee: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        sub_task_id: &str,
    ) -> Result<MoveOutcome> {
        self.move_sub_task_cross_employee(employee, from_date, employee, to_date, sub_task_id)
    }

    /// Move a sub-task from `(from_employee, from_date)` to
    /// `(to_employee, to_date)`.
    ///
    /// The sub-task keeps its status and is appended after the destination's
    /// existing sub-tasks; the source is re-ranked. It keeps its id too,
    /// unless the destination already holds one with the same id, in which
    /// case it gets a fresh one. The
    /// destination is written before the source, so a store that cannot
    /// commit both together may duplicate the sub-task on failure but never
    /// drop it. Any write failure is returned as-is; a committed destination
    /// write is not rolled back.
    #[instrument(skip(self))]
    pub fn move_sub_task_cross_employee(
        &self,
        from_employee: &str,
        from_date: NaiveDate,
        to_employee: &str,
        to_date: NaiveDate,
        sub_task_id: &str,
    ) -> Result<MoveOutcome> {
        let source_key = TaskKey::new(from_employee, from_date);
        let dest_key = TaskKey::new(to_employee, to_date);

        if source_key.same_document(&dest_key) {
            debug!("source and destination are the same cell");
            return Ok(no_op(NoOpReason::SameLocation));
        }

        let Some(source) = self.store.get(&source_key)?.map(migrate_task_to_sub_tasks) else {
            warn!(source = %source_key, "move aborted: source document missing");
            return Ok(no_op(NoOpReason::SourceMissing));
        };

        let mut remaining = source.sub_tasks;
        let Some(pos) = remaining.iter().position(|t| t.id == sub_task_id) else {
            warn!(source = %source_key, "move aborted: sub-task not in source");
            return Ok(no_op(NoOpReason::SubTaskMissing));
        };
        let mut moved = remaining.remove(pos);
        resequence(&mut remaining);

        let mut dest_list = self
            .store
            .get(&dest_key)?
            .map(|d| migrate_task_to_sub_tasks(d).sub_tasks)
            .unwrap_or_default();
        if dest_list.iter().any(|t| t.id == moved.id) {
            let fresh = generate_sub_task_id();
            debug!(old = %moved.id, new = %fresh, "destination already holds sub-task id");
            moved.id = fresh;
        }
        moved.order = next_order(&dest_list);
        dest_list.push(moved.clone());

        let dest_list = sanitize_sub_tasks(dest_list);
        let remaining = sanitize_sub_tasks(remaining);
        let placed = dest_list
            .iter()
            .find(|t| t.id == moved.id)
            .cloned()
            .unwrap_or(moved);

        self.store.upsert_many(&[
            (dest_key.clone(), FieldPatch::sub_tasks(dest_list)),
            (source_key.clone(), FieldPatch::sub_tasks(remaining)),
        ])?;

        info!(
            sub_task_id,
            from = %source_key,
            to = %dest_key,
            order = placed.order,
            "sub-task moved"
        );
        Ok(MoveOutcome::Moved {
            sub_task: placed,
            destination: dest_key.id(),
        })
    }

    // --- duplication -------------------------------------------------------

    /// Copy a sub-task within its own cell (fresh id, appended, same status).
    /// Returns `None` when the document or sub-task does not exist.
    #[instrument(skip(self))]
    pub fn duplicate_sub_task(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_task_id: &str,
    ) -> Result<Option<SubTask>> {
        let Some(original) = self.find_sub_task(employee, date, sub_task_id)? else {
            return Ok(None);
        };
        let copy = SubTaskDraft::new(original.content).with_status(original.status);
        self.add_sub_task_to_employee(employee, date, copy).map(Some)
    }

    /// Copy a sub-task to the same employee's next day, reset to pending.
    /// The source document is not touched. Fails with
    /// [`TaskError::InvalidInput`] when `date` is the last representable day.
    #[instrument(skip(self))]
    pub fn duplicate_sub_task_to_next_day(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_task_id: &str,
    ) -> Result<Option<SubTask>> {
        let Some(original) = self.find_sub_task(employee, date, sub_task_id)? else {
            return Ok(None);
        };
        let target = next_day(date)
            .ok_or_else(|| TaskError::InvalidInput(format!("no day after {date}")))?;
        let copy = SubTaskDraft::new(original.content).with_status(TaskStatus::Pending);
        self.add_sub_task_to_employee(employee, target, copy)
            .map(Some)
    }

    fn find_sub_task(
        &self,
        employee: &str,
        date: NaiveDate,
        sub_task_id: &str,
    ) -> Result<Option<SubTask>> {
        Ok(self
            .get(employee, date)?
            .and_then(|doc| doc.sub_tasks.into_iter().find(|t| t.id == sub_task_id)))
    }
}

fn no_op(reason: NoOpReason) -> MoveOutcome {
    MoveOutcome::NoOp { reason }
}

/// Range read shared by [`ScheduleTaskManager::list_range`] and the live
/// subscription: migrate each document, then sort client-side.
pub(crate) fn load_range<S: TaskStore + ?Sized>(
    store: &S,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ScheduleTask>> {
    let mut tasks: Vec<ScheduleTask> = store
        .query_range(start, end)?
        .into_iter()
        .map(migrate_task_to_sub_tasks)
        .collect();
    tasks.sort_by(|a, b| {
        a.task_date
            .cmp(&b.task_date)
            .then_with(|| a.employee_name.cmp(&b.employee_name))
    });
    Ok(tasks)
}
