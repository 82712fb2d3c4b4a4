//! Optimistic local state for one editable value.
//!
//! A client shows its edit immediately, then either confirms it when the
//! write succeeds or restores the value it had before the edit.

use std::fmt::Display;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState<T> {
    /// Matches the last known stored value.
    Clean(T),
    /// An edit is in flight; `previous` is what to restore on failure.
    Pending { tentative: T, previous: T },
    /// The last edit failed and the previous value was restored.
    RolledBack(T),
}

#[derive(Debug, Clone)]
pub struct OptimisticCell<T> {
    state: CellState<T>,
}

impl<T: Clone> OptimisticCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: CellState::Clean(value),
        }
    }

    /// The value to display right now.
    pub fn value(&self) -> &T {
        match &self.state {
            CellState::Clean(v) | CellState::RolledBack(v) => v,
            CellState::Pending { tentative, .. } => tentative,
        }
    }

    pub fn state(&self) -> &CellState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, CellState::Pending { .. })
    }

    /// Show `tentative` immediately. A second edit while one is pending keeps
    /// the original `previous`, so a later rollback restores the stored value.
    pub fn begin(&mut self, tentative: T) {
        let previous = match &self.state {
            CellState::Pending { previous, .. } => previous.clone(),
            CellState::Clean(v) | CellState::RolledBack(v) => v.clone(),
        };
        self.state = CellState::Pending {
            tentative,
            previous,
        };
    }

    pub fn confirm(&mut self) {
        if let CellState::Pending { tentative, .. } = &self.state {
            self.state = CellState::Clean(tentative.clone());
        }
    }

    pub fn rollback(&mut self) {
        if let CellState::Pending { previous, .. } = &self.state {
            self.state = CellState::RolledBack(previous.clone());
        }
    }

    /// Confirm on `Ok`, roll back (and log) on `Err`.
    pub fn settle<R, E: Display>(&mut self, result: &Result<R, E>) {
        match result {
            Ok(_) => self.confirm(),
            Err(e) => {
                warn!("write failed, restoring previous value: {e}");
                self.rollback();
            }
        }
    }

    /// Replace with a value observed from the store (e.g. a subscription
    /// snapshot). Ignored while an edit is pending.
    pub fn observe(&mut self, stored: T) {
        if !self.is_pending() {
            self.state = CellState::Clean(stored);
        }
    }
}
