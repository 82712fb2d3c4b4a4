// End-to-end behaviour of ScheduleTaskManager over an in-memory SQLite store.

use chrono::NaiveDate;
use weekboard_tasks::{
    ScheduleTaskManager, SqliteTaskStore, SubTaskDraft, TaskError, TaskStatus, TaskStore,
    WorkLocation,
};

fn manager() -> ScheduleTaskManager<SqliteTaskStore> {
    ScheduleTaskManager::new(SqliteTaskStore::open_in_memory("schedule_tasks").unwrap())
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[test]
fn saving_sub_tasks_derives_content_and_status() {
    let mgr = manager();
    mgr.save_sub_tasks(
        "Jana",
        day(4),
        vec![
            SubTaskDraft::new("Draft copy").with_order(0),
            SubTaskDraft::new("Review")
                .with_status(TaskStatus::Completed)
                .with_order(1),
        ],
    )
    .unwrap();

    let doc = mgr.get("Jana", day(4)).unwrap().expect("document exists");
    assert_eq!(doc.id, "jana_2024-03-04");
    assert_eq!(doc.status, TaskStatus::InProgress);
    assert_eq!(doc.task_content, "Draft copy\nReview");
    assert_eq!(weekboard_tasks::derive::calculate_progress(&doc.sub_tasks), 50);
}

#[test]
fn saved_orders_are_contiguous_and_ids_unique() {
    let mgr = manager();
    let saved = mgr
        .save_sub_tasks(
            "Petr",
            day(5),
            vec![
                SubTaskDraft::new("c").with_order(40),
                SubTaskDraft::new("a").with_order(-3),
                SubTaskDraft::new("b").with_order(7),
            ],
        )
        .unwrap();

    let contents: Vec<&str> = saved.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["a", "b", "c"]);
    let orders: Vec<u32> = saved.iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    let ids: std::collections::HashSet<&str> = saved.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn absence_creates_document_with_defaults() {
    let mgr = manager();
    mgr.toggle_absence("Jana", day(6), true).unwrap();

    let doc = mgr.get("Jana", day(6)).unwrap().expect("created");
    assert!(doc.is_absent);
    assert_eq!(doc.status, TaskStatus::Pending);
    assert!(doc.sub_tasks.is_empty());
    assert_eq!(doc.task_content, "");
}

#[test]
fn field_writes_do_not_clobber_each_other() {
    let mgr = manager();
    mgr.save_sub_tasks("Jana", day(4), vec![SubTaskDraft::new("Plan")])
        .unwrap();
    mgr.set_work_location("Jana", day(4), WorkLocation::Homeoffice)
        .unwrap();
    mgr.toggle_absence("Jana", day(4), true).unwrap();

    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.sub_tasks.len(), 1);
    assert_eq!(doc.work_location, WorkLocation::Homeoffice);
    assert!(doc.is_absent);
}

#[test]
fn adding_twice_appends_in_order() {
    let mgr = manager();
    let first = mgr
        .add_sub_task_to_employee("Jana", day(4), SubTaskDraft::new("one"))
        .unwrap();
    let second = mgr
        .add_sub_task_to_employee("Jana", day(4), SubTaskDraft::new("two"))
        .unwrap();
    assert_eq!(first.order, 0);
    assert_eq!(second.order, 1);

    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.task_content, "one\ntwo");
}

#[test]
fn legacy_documents_read_as_one_sub_task() {
    let mgr = manager();
    mgr.store()
        .insert_legacy(
            &weekboard_tasks::TaskKey::new("Jana", day(4)),
            "Call client",
            TaskStatus::Completed,
        )
        .unwrap();

    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.sub_tasks.len(), 1);
    assert_eq!(doc.sub_tasks[0].content, "Call client");
    assert_eq!(doc.sub_tasks[0].status, TaskStatus::Completed);
    assert_eq!(doc.status, TaskStatus::Completed);

    // Same synthetic id on every read.
    let again = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.sub_tasks[0].id, again.sub_tasks[0].id);
}

#[test]
fn sub_task_status_updates_aggregate() {
    let mgr = manager();
    let saved = mgr
        .save_sub_tasks(
            "Jana",
            day(4),
            vec![SubTaskDraft::new("a"), SubTaskDraft::new("b")],
        )
        .unwrap();

    for t in &saved {
        assert!(mgr
            .set_sub_task_status("Jana", day(4), &t.id, TaskStatus::Completed)
            .unwrap());
    }
    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.status, TaskStatus::Completed);

    assert!(!mgr
        .set_sub_task_status("Jana", day(4), "missing", TaskStatus::Pending)
        .unwrap());
    assert!(!mgr
        .set_sub_task_status("Nobody", day(4), "missing", TaskStatus::Pending)
        .unwrap());
}

#[test]
fn range_is_inclusive_and_sorted() {
    let mgr = manager();
    mgr.toggle_absence("Petr", day(5), true).unwrap();
    mgr.toggle_absence("Jana", day(5), true).unwrap();
    mgr.toggle_absence("Jana", day(4), true).unwrap();
    mgr.toggle_absence("Jana", day(11), true).unwrap();

    let tasks = mgr.list_range(day(4), day(10)).unwrap();
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["jana_2024-03-04", "jana_2024-03-05", "petr_2024-03-05"]
    );
    assert_eq!(mgr.list_range(day(11), day(11)).unwrap().len(), 1);
}

#[test]
fn duplicate_in_place_keeps_status() {
    let mgr = manager();
    let added = mgr
        .add_sub_task_to_employee(
            "Jana",
            day(4),
            SubTaskDraft::new("Report").with_status(TaskStatus::InProgress),
        )
        .unwrap();

    let copy = mgr
        .duplicate_sub_task("Jana", day(4), &added.id)
        .unwrap()
        .expect("copied");
    assert_ne!(copy.id, added.id);
    assert_eq!(copy.content, "Report");
    assert_eq!(copy.status, TaskStatus::InProgress);
    assert_eq!(copy.order, 1);
}

#[test]
fn duplicate_to_next_day_resets_status() {
    let mgr = manager();
    let added = mgr
        .add_sub_task_to_employee(
            "Jana",
            day(4),
            SubTaskDraft::new("Report").with_status(TaskStatus::Completed),
        )
        .unwrap();

    let copy = mgr
        .duplicate_sub_task_to_next_day("Jana", day(4), &added.id)
        .unwrap()
        .expect("copied");
    assert_eq!(copy.status, TaskStatus::Pending);

    let next = mgr.get("Jana", day(5)).unwrap().unwrap();
    assert_eq!(next.sub_tasks.len(), 1);
    let source = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(source.sub_tasks.len(), 1);

    assert!(mgr
        .duplicate_sub_task_to_next_day("Jana", day(4), "missing")
        .unwrap()
        .is_none());
}

#[test]
fn weekly_stats_summarise_range() {
    let mgr = manager();
    mgr.save_sub_tasks(
        "Jana",
        day(4),
        vec![
            SubTaskDraft::new("a").with_status(TaskStatus::Completed),
            SubTaskDraft::new("b"),
        ],
    )
    .unwrap();
    mgr.set_work_location("Jana", day(5), WorkLocation::Office)
        .unwrap();

    let stats = mgr.weekly_stats(day(4), day(10)).unwrap();
    let jana = &stats["Jana"];
    assert_eq!(jana.total_sub_tasks, 2);
    assert_eq!(jana.progress, 50);
    assert_eq!(jana.office_days, 1);

    assert!(mgr.store().get(&weekboard_tasks::TaskKey::new("Jana", day(5))).unwrap().is_some());
}

#[test]
fn blank_sub_tasks_are_dropped_on_save() {
    let mgr = manager();
    let saved = mgr
        .save_sub_tasks(
            "Jana",
            day(4),
            vec![
                SubTaskDraft::new("a"),
                SubTaskDraft::new("   "),
                SubTaskDraft::default(),
                SubTaskDraft::new("b"),
            ],
        )
        .unwrap();

    assert_eq!(saved.len(), 2);
    let orders: Vec<u32> = saved.iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1]);
    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.task_content, "a\nb");
    assert_eq!(doc.sub_tasks, saved);

    let err = mgr
        .add_sub_task_to_employee("Jana", day(4), SubTaskDraft::new(" "))
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidInput(_)));
    assert_eq!(mgr.get("Jana", day(4)).unwrap().unwrap().sub_tasks.len(), 2);
}

#[test]
fn adding_with_a_taken_id_gets_a_fresh_one() {
    let mgr = manager();
    let first = mgr
        .add_sub_task_to_employee("Jana", day(4), SubTaskDraft::new("one"))
        .unwrap();

    let clash = SubTaskDraft {
        id: Some(first.id.clone()),
        ..SubTaskDraft::new("two")
    };
    let second = mgr.add_sub_task_to_employee("Jana", day(4), clash).unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.content, "two");

    let doc = mgr.get("Jana", day(4)).unwrap().unwrap();
    assert_eq!(doc.sub_tasks.len(), 2);
    assert_eq!(doc.sub_tasks[0].content, "one");
    assert_eq!(doc.sub_tasks[0].id, first.id);

    // An unused caller id is kept.
    let chosen = SubTaskDraft {
        id: Some("picked-by-client".into()),
        ..SubTaskDraft::new("three")
    };
    let third = mgr.add_sub_task_to_employee("Jana", day(4), chosen).unwrap();
    assert_eq!(third.id, "picked-by-client");
}

#[test]
fn duplicate_to_next_day_fails_on_last_calendar_day() {
    let mgr = manager();
    let last = NaiveDate::MAX;
    let added = mgr
        .add_sub_task_to_employee("Jana", last, SubTaskDraft::new("Report"))
        .unwrap();

    let err = mgr
        .duplicate_sub_task_to_next_day("Jana", last, &added.id)
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidInput(_)));
    assert_eq!(mgr.get("Jana", last).unwrap().unwrap().sub_tasks.len(), 1);
}
