//! Budget and seen-set shared by every worker of one crawl run.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::models::{DedupKey, NormalizedTool};

/// Outcome of offering a normalized record to the crawl state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Record counted; carries the new accepted count.
    Accepted(usize),
    /// A record with the same dedup key was already accepted.
    Duplicate,
    /// `max_items` was already reached; nothing was recorded.
    BudgetExhausted,
}

#[derive(Debug, Default)]
struct StateInner {
    accepted: usize,
    seen: HashSet<DedupKey>,
}

/// Serialized budget counter and seen-set for one crawl run.
///
/// All mutation goes through [`CrawlState::try_accept`], which performs the
/// budget check, dedup check, key insertion and increment under one lock.
/// Reaching `max_items` cancels the run's token so workers stop dispatching.
#[derive(Debug)]
pub struct CrawlState {
    max_items: usize,
    inner: Mutex<StateInner>,
    cancel: CancellationToken,
}

impl CrawlState {
    pub fn new(max_items: usize) -> Self {
        Self::with_token(max_items, CancellationToken::new())
    }

    /// State whose cancel token is a child of `parent`: cancelling the parent
    /// stops the run, exhausting the budget does not touch the parent.
    pub fn with_parent(max_items: usize, parent: &CancellationToken) -> Self {
        Self::with_token(max_items, parent.child_token())
    }

    fn with_token(max_items: usize, cancel: CancellationToken) -> Self {
        let state = Self {
            max_items,
            inner: Mutex::new(StateInner::default()),
            cancel,
        };
        if max_items == 0 {
            state.cancel.cancel();
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically check budget and duplicates, then record the tool.
    pub fn try_accept(&self, tool: &NormalizedTool) -> Acceptance {
        let mut inner = self.lock();

        if inner.accepted >= self.max_items {
            self.cancel.cancel();
            return Acceptance::BudgetExhausted;
        }

        if !inner.seen.insert(tool.dedup_key()) {
            return Acceptance::Duplicate;
        }

        inner.accepted += 1;
        if inner.accepted >= self.max_items {
            self.cancel.cancel();
        }
        Acceptance::Accepted(inner.accepted)
    }

    pub fn accepted(&self) -> usize {
        self.lock().accepted
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Records still allowed before the budget is exhausted.
    pub fn remaining(&self) -> usize {
        self.max_items.saturating_sub(self.accepted())
    }

    pub fn is_exhausted(&self) -> bool {
        self.accepted() >= self.max_items
    }

    /// Number of distinct dedup keys accepted so far.
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Cooperative abort signal for the worker pool.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
