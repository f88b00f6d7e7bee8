//! Infinite-scroll termination protocol for live-rendered listing pages.
//!
//! ```text
//! SCROLLING --[no growth]--> STALLED(1) --[no growth]--> ... STALLED(3) --> DONE
//!     ^                           |
//!     +-------[growth]------------+
//!
//! any state --[count >= target | attempts == cap]--> DONE
//! ```
//!
//! Each attempt scrolls to the bottom, waits a settle interval for lazy
//! content, and re-counts the loaded item elements. The attempt cap
//! `ceil(target / items_per_batch)` bounds the loop even if the stall
//! heuristic never fires.

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Consecutive no-growth observations that mean the end of content.
pub const DEFAULT_STALL_LIMIT: u32 = 3;

/// Default wait after each scroll for lazy-loaded items to render.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1500);

/// How a rendered page should be scrolled before its DOM is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPlan {
    /// CSS selector matching one loaded item (e.g. a tool card).
    pub item_selector: String,
    /// Items one scroll is expected to load; sizes the attempt cap.
    pub items_per_batch: usize,
    /// Stop early once this many items are loaded (budget-derived).
    pub target_items: usize,
    pub settle: Duration,
    pub stall_limit: u32,
    /// How long to wait for the first item before scrolling anyway.
    pub selector_timeout: Duration,
}

impl ScrollPlan {
    pub fn new(item_selector: impl Into<String>, items_per_batch: usize, target_items: usize) -> Self {
        Self {
            item_selector: item_selector.into(),
            items_per_batch: items_per_batch.max(1),
            target_items,
            settle: DEFAULT_SETTLE,
            stall_limit: DEFAULT_STALL_LIMIT,
            selector_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Hard cap on scroll attempts: `ceil(target / items_per_batch)`, at least 1.
    pub fn max_attempts(&self) -> u32 {
        let attempts = self.target_items.div_ceil(self.items_per_batch).max(1);
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }
}

/// Why scrolling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEnd {
    /// The item count stopped growing for `stall_limit` observations.
    EndOfContent,
    /// Enough items were loaded to cover the remaining budget.
    TargetReached,
    /// The attempt cap ended scrolling before an organic stall.
    AttemptCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Scrolling,
    /// Consecutive observations without growth.
    Stalled(u32),
    Done(ScrollEnd),
}

/// Pure state machine fed with item counts after each scroll.
#[derive(Debug, Clone)]
pub struct ScrollMachine {
    state: ScrollState,
    previous_count: usize,
    attempts: u32,
    max_attempts: u32,
    target_items: usize,
    stall_limit: u32,
}

impl ScrollMachine {
    pub fn new(plan: &ScrollPlan) -> Self {
        Self {
            state: ScrollState::Scrolling,
            previous_count: 0,
            attempts: 0,
            max_attempts: plan.max_attempts(),
            target_items: plan.target_items,
            stall_limit: plan.stall_limit.max(1),
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ScrollState::Done(_))
    }

    /// Record the item count measured after one scroll attempt.
    pub fn observe(&mut self, current_count: usize) -> ScrollState {
        if self.is_done() {
            return self.state;
        }
        self.attempts += 1;

        let stalls = match self.state {
            ScrollState::Stalled(n) => n,
            _ => 0,
        };

        self.state = if current_count > self.previous_count {
            ScrollState::Scrolling
        } else if stalls + 1 >= self.stall_limit {
            ScrollState::Done(ScrollEnd::EndOfContent)
        } else {
            ScrollState::Stalled(stalls + 1)
        };
        self.previous_count = current_count;

        if !self.is_done() {
            if current_count >= self.target_items {
                self.state = ScrollState::Done(ScrollEnd::TargetReached);
            } else if self.attempts >= self.max_attempts {
                self.state = ScrollState::Done(ScrollEnd::AttemptCap);
            }
        }

        self.state
    }
}

/// Remote rendering surface the scroll protocol drives.
pub trait ScrollDriver: Send {
    fn scroll_to_bottom(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn count_items(&mut self, selector: &str)
    -> impl Future<Output = Result<usize, AppError>> + Send;
}

/// Result of a completed scroll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub attempts: u32,
    pub loaded_items: usize,
    pub end: ScrollEnd,
}

/// Drive `driver` until the scroll state machine reaches `Done`.
pub async fn run_scroll<D: ScrollDriver>(
    driver: &mut D,
    plan: &ScrollPlan,
) -> Result<ScrollOutcome, AppError> {
    let mut machine = ScrollMachine::new(plan);

    tracing::info!(
        selector = %plan.item_selector,
        target = plan.target_items,
        max_attempts = plan.max_attempts(),
        "Starting infinite scroll"
    );

    loop {
        driver.scroll_to_bottom().await?;
        if !plan.settle.is_zero() {
            tokio::time::sleep(plan.settle).await;
        }
        let loaded_items = driver.count_items(&plan.item_selector).await?;

        match machine.observe(loaded_items) {
            ScrollState::Scrolling => {
                tracing::debug!(loaded_items, attempt = machine.attempts(), "Items loaded");
            }
            ScrollState::Stalled(n) => {
                tracing::debug!(loaded_items, stalls = n, "No new items loaded");
            }
            ScrollState::Done(end) => {
                match end {
                    ScrollEnd::EndOfContent => {
                        tracing::info!(loaded_items, "Reached end of infinite scroll")
                    }
                    ScrollEnd::TargetReached => {
                        tracing::info!(loaded_items, "Loaded enough items")
                    }
                    ScrollEnd::AttemptCap => tracing::info!(
                        loaded_items,
                        attempts = machine.attempts(),
                        "Scroll attempt cap reached before content stalled"
                    ),
                }
                return Ok(ScrollOutcome {
                    attempts: machine.attempts(),
                    loaded_items,
                    end,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simulated page: item counts observed after each successive scroll.
    struct SimulatedPage {
        counts: Vec<usize>,
        scrolls: usize,
    }

    impl SimulatedPage {
        fn new(counts: Vec<usize>) -> Self {
            Self { counts, scrolls: 0 }
        }
    }

    impl ScrollDriver for SimulatedPage {
        async fn scroll_to_bottom(&mut self) -> Result<(), AppError> {
            self.scrolls += 1;
            Ok(())
        }

        async fn count_items(&mut self, _selector: &str) -> Result<usize, AppError> {
            let idx = self.scrolls.saturating_sub(1).min(self.counts.len() - 1);
            Ok(self.counts[idx])
        }
    }

    fn plan(target: usize) -> ScrollPlan {
        ScrollPlan::new(".tool-card", 50, target).with_settle(Duration::ZERO)
    }

    #[test]
    fn attempt_cap_is_ceil_of_target_over_batch() {
        assert_eq!(plan(100).max_attempts(), 2);
        assert_eq!(plan(101).max_attempts(), 3);
        assert_eq!(plan(1).max_attempts(), 1);
        assert_eq!(plan(0).max_attempts(), 1);
    }

    #[test]
    fn stall_counter_resets_on_growth() {
        let mut m = ScrollMachine::new(&plan(1000));
        assert_eq!(m.observe(10), ScrollState::Scrolling);
        assert_eq!(m.observe(10), ScrollState::Stalled(1));
        assert_eq!(m.observe(10), ScrollState::Stalled(2));
        assert_eq!(m.observe(20), ScrollState::Scrolling);
        assert_eq!(m.observe(20), ScrollState::Stalled(1));
    }

    #[test]
    fn target_reached_ends_early() {
        let mut m = ScrollMachine::new(&plan(60));
        assert_eq!(m.observe(50), ScrollState::Scrolling);
        assert_eq!(m.observe(70), ScrollState::Done(ScrollEnd::TargetReached));
        assert_eq!(m.attempts(), 2);
        // Further observations do not move a finished machine.
        assert_eq!(m.observe(90), ScrollState::Done(ScrollEnd::TargetReached));
        assert_eq!(m.attempts(), 2);
    }

    #[test]
    fn cap_ends_scrolling_when_content_keeps_growing() {
        let mut m = ScrollMachine::new(&plan(1000));
        let mut state = ScrollState::Scrolling;
        for i in 1..=20 {
            state = m.observe(i * 10);
        }
        assert_eq!(state, ScrollState::Done(ScrollEnd::AttemptCap));
        assert_eq!(m.attempts(), 20);
    }

    #[tokio::test]
    async fn stops_after_three_stalls_following_growth() {
        // Growth on scrolls 1 and 2, then nothing new.
        let mut page = SimulatedPage::new(vec![50, 100, 100, 100, 100, 100, 100]);
        let outcome = run_scroll(&mut page, &plan(1000)).await.unwrap();

        assert_eq!(outcome.end, ScrollEnd::EndOfContent);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(page.scrolls, 5);
        assert_eq!(outcome.loaded_items, 100);
    }

    #[tokio::test]
    async fn empty_page_stalls_out() {
        let mut page = SimulatedPage::new(vec![0]);
        let outcome = run_scroll(&mut page, &plan(1000)).await.unwrap();
        assert_eq!(outcome.end, ScrollEnd::EndOfContent);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn driver_errors_propagate() {
        struct Broken;
        impl ScrollDriver for Broken {
            async fn scroll_to_bottom(&mut self) -> Result<(), AppError> {
                Err(AppError::BrowserError("target closed".into()))
            }
            async fn count_items(&mut self, _selector: &str) -> Result<usize, AppError> {
                Ok(0)
            }
        }

        let err = run_scroll(&mut Broken, &plan(10)).await.unwrap_err();
        assert!(matches!(err, AppError::BrowserError(_)));
    }
}
