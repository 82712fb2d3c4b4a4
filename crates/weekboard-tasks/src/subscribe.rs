use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{broadcast::error::RecvError, watch};
use tracing::{debug, error, info, warn};

use crate::manager::{load_range, ScheduleTaskManager};
use crate::stats::{weekly_stats, WeeklyStats};
use crate::store::TaskStore;
use crate::types::ScheduleTask;

/// Live range subscription handle.
///
/// Call [`Subscription::unsubscribe`] on teardown; dropping the handle has the
/// same effect.
pub struct Subscription {
    shutdown: watch::Sender<bool>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    pub fn is_active(&self) -> bool {
        !self.shutdown.is_closed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl<S: TaskStore> ScheduleTaskManager<S> {
    /// Deliver the documents in `[start, end]` now and again after every
    /// change to a document in that range.
    ///
    /// Each snapshot is the full matching set, migrated and sorted by
    /// `(task_date, employee_name)`. Must be called inside a tokio runtime.
    pub fn subscribe_to_range<F>(&self, start: NaiveDate, end: NaiveDate, callback: F) -> Subscription
    where
        F: FnMut(Vec<ScheduleTask>) + Send + 'static,
    {
        spawn_listener(Arc::clone(self.store()), start, end, callback)
    }

    /// Per-employee [`WeeklyStats`] for `[start, end]`, recomputed on every
    /// change in range.
    pub fn subscribe_to_weekly_stats<F>(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        mut callback: F,
    ) -> Subscription
    where
        F: FnMut(BTreeMap<String, WeeklyStats>) + Send + 'static,
    {
        self.subscribe_to_range(start, end, move |tasks| callback(weekly_stats(&tasks)))
    }

    /// One-shot variant of [`Self::subscribe_to_weekly_stats`].
    pub fn weekly_stats(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> crate::error::Result<BTreeMap<String, WeeklyStats>> {
        Ok(weekly_stats(&self.list_range(start, end)?))
    }
}

fn spawn_listener<S, F>(store: Arc<S>, start: NaiveDate, end: NaiveDate, mut callback: F) -> Subscription
where
    S: TaskStore,
    F: FnMut(Vec<ScheduleTask>) + Send + 'static,
{
    let (shutdown_tx, mut shutdown) = watch::channel(false);
    // Subscribe before the initial read so no change slips between the two.
    let mut changes = store.subscribe_changes();

    tokio::spawn(async move {
        info!(%start, %end, "range subscription opened");
        deliver(store.as_ref(), start, end, &mut callback);

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(c) if c.in_range(start, end) => {
                        debug!(id = %c.id, "change in range");
                        deliver(store.as_ref(), start, end, &mut callback);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscription lagged; re-reading range");
                        deliver(store.as_ref(), start, end, &mut callback);
                    }
                    Err(RecvError::Closed) => break,
                },
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(%start, %end, "range subscription closed");
    });

    Subscription {
        shutdown: shutdown_tx,
    }
}

fn deliver<S, F>(store: &S, start: NaiveDate, end: NaiveDate, callback: &mut F)
where
    S: TaskStore + ?Sized,
    F: FnMut(Vec<ScheduleTask>),
{
    match load_range(store, start, end) {
        Ok(tasks) => callback(tasks),
        Err(e) => error!(%start, %end, "range snapshot failed: {e}"),
    }
}
