use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ScheduleTask, TaskStatus, WorkLocation};

/// Per-employee totals over a date range (usually one week).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub total_sub_tasks: u32,
    pub completed_sub_tasks: u32,
    /// Rounded completed share, 0 when there are no sub-tasks.
    pub progress: u8,
    pub absent_days: u32,
    pub office_days: u32,
    pub home_office_days: u32,
}

/// Aggregate `tasks` by `employee_name`. Expects migrated documents.
pub fn weekly_stats(tasks: &[ScheduleTask]) -> BTreeMap<String, WeeklyStats> {
    let mut out: BTreeMap<String, WeeklyStats> = BTreeMap::new();
    for task in tasks {
        let entry = out.entry(task.employee_name.clone()).or_default();
        entry.total_sub_tasks += task.sub_tasks.len() as u32;
        entry.completed_sub_tasks += task
            .sub_tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count() as u32;
        if task.is_absent {
            entry.absent_days += 1;
        }
        match task.work_location {
            WorkLocation::Office => entry.office_days += 1,
            WorkLocation::Homeoffice => entry.home_office_days += 1,
            WorkLocation::Unset => {}
        }
    }
    for stats in out.values_mut() {
        stats.progress = if stats.total_sub_tasks == 0 {
            0
        } else {
            (stats.completed_sub_tasks as f64 * 100.0 / stats.total_sub_tasks as f64).round() as u8
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubTask;
    use chrono::{NaiveDate, Utc};

    fn doc(name: &str, day: u32, statuses: &[TaskStatus]) -> ScheduleTask {
        ScheduleTask {
            id: format!("{}_{day}", name.to_lowercase()),
            employee_name: name.into(),
            task_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            task_content: String::new(),
            status: TaskStatus::Pending,
            sub_tasks: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| SubTask {
                    id: format!("{name}-{day}-{i}"),
                    content: "x".into(),
                    status: *s,
                    order: i as u32,
                })
                .collect(),
            is_absent: false,
            work_location: WorkLocation::Unset,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn aggregates_per_employee() {
        let mut monday = doc("Jana", 4, &[TaskStatus::Completed, TaskStatus::Pending]);
        monday.work_location = WorkLocation::Office;
        let mut tuesday = doc("Jana", 5, &[TaskStatus::Completed]);
        tuesday.work_location = WorkLocation::Homeoffice;
        let mut absent = doc("Petr", 4, &[]);
        absent.is_absent = true;

        let stats = weekly_stats(&[monday, tuesday, absent]);
        let jana = &stats["Jana"];
        assert_eq!(jana.total_sub_tasks, 3);
        assert_eq!(jana.completed_sub_tasks, 2);
        assert_eq!(jana.progress, 67);
        assert_eq!(jana.office_days, 1);
        assert_eq!(jana.home_office_days, 1);

        let petr = &stats["Petr"];
        assert_eq!(petr.absent_days, 1);
        assert_eq!(petr.progress, 0);
    }
}
