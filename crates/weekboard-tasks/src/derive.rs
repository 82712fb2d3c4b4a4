//! Pure functions that keep a document's derived fields consistent with its
//! sub-task list.

use std::collections::HashSet;

use uuid::Uuid;

use crate::types::{ScheduleTask, SubTask, SubTaskDraft, TaskStatus};

/// Fresh sub-task id. UUIDv7: millisecond timestamp plus random bits, so ids
/// created concurrently on different clients do not collide.
pub fn generate_sub_task_id() -> String {
    Uuid::now_v7().to_string()
}

/// Aggregate status of a sub-task list.
///
/// Empty or all-pending is `Pending`; all-completed is `Completed`; anything
/// else with at least one started or finished entry is `InProgress`.
pub fn calculate_overall_status(sub_tasks: &[SubTask]) -> TaskStatus {
    if sub_tasks.is_empty() {
        return TaskStatus::Pending;
    }
    if sub_tasks.iter().all(|t| t.status == TaskStatus::Completed) {
        return TaskStatus::Completed;
    }
    if sub_tasks.iter().any(|t| t.status != TaskStatus::Pending) {
        return TaskStatus::InProgress;
    }
    TaskStatus::Pending
}

/// Completed share as a rounded percentage, 0 for an empty list.
pub fn calculate_progress(sub_tasks: &[SubTask]) -> u8 {
    if sub_tasks.is_empty() {
        return 0;
    }
    let completed = sub_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    ((completed as f64 * 100.0) / sub_tasks.len() as f64).round() as u8
}

/// Non-empty contents joined with `\n`, in list order.
pub fn flatten_content(sub_tasks: &[SubTask]) -> String {
    sub_tasks
        .iter()
        .map(|t| t.content.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Upgrade a pre-sub-task document in memory.
///
/// A document with text but no sub-tasks gets exactly one synthetic sub-task
/// carrying the whole text and the document's status. Anything else comes
/// back unchanged, so applying this twice equals applying it once.
pub fn migrate_task_to_sub_tasks(mut task: ScheduleTask) -> ScheduleTask {
    if !task.sub_tasks.is_empty() || task.task_content.is_empty() {
        return task;
    }
    task.sub_tasks = vec![SubTask {
        id: legacy_sub_task_id(&task.id),
        content: task.task_content.clone(),
        status: task.status,
        order: 0,
    }];
    task
}

/// Deterministic id for the synthetic sub-task, so repeated reads of the same
/// legacy document agree on its id until the migration is persisted.
fn legacy_sub_task_id(doc_id: &str) -> String {
    format!("legacy-{doc_id}")
}

/// Normalise caller-supplied sub-tasks into the persisted shape.
///
/// Missing ids are generated, missing or blank content becomes `""`, missing
/// status becomes `Pending`, missing order becomes `0`. The result is sorted
/// by the supplied order (ties keep input position) and then re-ranked to
/// `0..n-1`. An id seen earlier in the sorted list is replaced by a fresh one.
pub fn sanitize_sub_tasks<I, D>(drafts: I) -> Vec<SubTask>
where
    I: IntoIterator<Item = D>,
    D: Into<SubTaskDraft>,
{
    let mut ranked: Vec<(i64, SubTask)> = drafts
        .into_iter()
        .map(Into::into)
        .map(|d| {
            let rank = d.order.unwrap_or(0);
            let task = SubTask {
                id: d.id.unwrap_or_else(generate_sub_task_id),
                content: d.content.map(|c| c.trim().to_string()).unwrap_or_default(),
                status: d.status.unwrap_or_default(),
                order: 0,
            };
            (rank, task)
        })
        .collect();

    // Stable: equal ranks stay in array order.
    ranked.sort_by_key(|(rank, _)| *rank);

    let mut seen = HashSet::new();
    let mut tasks: Vec<SubTask> = ranked
        .into_iter()
        .map(|(_, mut t)| {
            if !seen.insert(t.id.clone()) {
                t.id = generate_sub_task_id();
                seen.insert(t.id.clone());
            }
            t
        })
        .collect();
    resequence(&mut tasks);
    tasks
}

/// Re-rank in current list order to `0..n-1`.
pub fn resequence(sub_tasks: &mut [SubTask]) {
    for (i, t) in sub_tasks.iter_mut().enumerate() {
        t.order = i as u32;
    }
}

/// Order value that appends after every existing entry: `max(order) + 1`,
/// or `0` for an empty list.
pub fn next_order(sub_tasks: &[SubTask]) -> u32 {
    sub_tasks.iter().map(|t| t.order + 1).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskStatus::*, WorkLocation};
    use chrono::{NaiveDate, Utc};

    fn st(content: &str, status: TaskStatus, order: u32) -> SubTask {
        SubTask {
            id: format!("id-{content}"),
            content: content.to_string(),
            status,
            order,
        }
    }

    fn legacy(content: &str, status: TaskStatus) -> ScheduleTask {
        ScheduleTask {
            id: "jana_2024-03-04".into(),
            employee_name: "Jana".into(),
            task_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            task_content: content.into(),
            status,
            sub_tasks: vec![],
            is_absent: false,
            work_location: WorkLocation::Unset,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn overall_status_table() {
        assert_eq!(calculate_overall_status(&[]), Pending);
        assert_eq!(
            calculate_overall_status(&[st("a", Pending, 0), st("b", Pending, 1)]),
            Pending
        );
        assert_eq!(
            calculate_overall_status(&[st("a", Completed, 0), st("b", Completed, 1)]),
            Completed
        );
        assert_eq!(
            calculate_overall_status(&[st("a", Completed, 0), st("b", Pending, 1)]),
            InProgress
        );
        assert_eq!(
            calculate_overall_status(&[st("a", InProgress, 0), st("b", Pending, 1)]),
            InProgress
        );
    }

    #[test]
    fn progress_rounds_to_nearest() {
        assert_eq!(calculate_progress(&[]), 0);
        assert_eq!(
            calculate_progress(&[st("a", Completed, 0), st("b", Pending, 1)]),
            50
        );
        // 1/3 -> 33, 2/3 -> 67
        let three = [st("a", Completed, 0), st("b", Pending, 1), st("c", InProgress, 2)];
        assert_eq!(calculate_progress(&three), 33);
        let three = [st("a", Completed, 0), st("b", Completed, 1), st("c", InProgress, 2)];
        assert_eq!(calculate_progress(&three), 67);
    }

    #[test]
    fn flatten_skips_empty_contents() {
        let list = [st("Draft copy", Pending, 0), st("", Pending, 1), st("Review", Completed, 2)];
        assert_eq!(flatten_content(&list), "Draft copy\nReview");
    }

    #[test]
    fn migrate_legacy_document() {
        let doc = migrate_task_to_sub_tasks(legacy("Call client", Completed));
        assert_eq!(doc.sub_tasks.len(), 1);
        assert_eq!(doc.sub_tasks[0].content, "Call client");
        assert_eq!(doc.sub_tasks[0].status, Completed);
        assert_eq!(doc.sub_tasks[0].order, 0);
        assert_eq!(calculate_overall_status(&doc.sub_tasks), Completed);
    }

    #[test]
    fn migrate_is_idempotent() {
        let once = migrate_task_to_sub_tasks(legacy("Call client", InProgress));
        let twice = migrate_task_to_sub_tasks(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn migrate_leaves_empty_and_structured_documents_alone() {
        let empty = legacy("", Pending);
        assert_eq!(migrate_task_to_sub_tasks(empty.clone()), empty);

        let mut structured = legacy("stale text", Pending);
        structured.sub_tasks = vec![st("real", Completed, 0)];
        assert_eq!(migrate_task_to_sub_tasks(structured.clone()), structured);
    }

    #[test]
    fn sanitize_fills_defaults_and_sorts_by_order() {
        let drafts = vec![
            SubTaskDraft::new("third").with_order(7),
            SubTaskDraft {
                id: Some("keep-me".into()),
                content: Some("  first  ".into()),
                status: Some(Completed),
                order: Some(-1),
            },
            SubTaskDraft::default().with_order(3),
        ];
        let out = sanitize_sub_tasks(drafts);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].id, "keep-me");
        assert_eq!(out[0].content, "first");
        assert_eq!(out[1].content, "");
        assert_eq!(out[1].status, Pending);
        assert_eq!(out[2].content, "third");
        let orders: Vec<u32> = out.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(!out[1].id.is_empty());
        assert_ne!(out[1].id, out[2].id);
    }

    #[test]
    fn sanitize_keeps_input_order_for_ties() {
        let out = sanitize_sub_tasks(vec![SubTaskDraft::new("a"), SubTaskDraft::new("b")]);
        assert_eq!(out[0].content, "a");
        assert_eq!(out[1].content, "b");
    }

    #[test]
    fn sanitize_reissues_repeated_ids() {
        let out = sanitize_sub_tasks(vec![
            st("first", Completed, 0),
            st("second", Pending, 1),
            SubTask {
                id: "id-first".into(),
                ..st("again", Pending, 2)
            },
        ]);

        assert_eq!(out[0].id, "id-first");
        assert_eq!(out[2].content, "again");
        assert_ne!(out[2].id, "id-first");
        let ids: HashSet<&str> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn next_order_appends() {
        assert_eq!(next_order(&[]), 0);
        assert_eq!(next_order(&[st("a", Pending, 0), st("b", Pending, 4)]), 5);
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| generate_sub_task_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
