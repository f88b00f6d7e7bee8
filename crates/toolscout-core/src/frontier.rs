//! Shared request queue pulled by the crawl worker pool.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::route::RouteLabel;

/// A pending page visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: String,
    /// Extractor selection. `None` means "classify at dispatch time".
    pub label: Option<RouteLabel>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, label: Option<RouteLabel>) -> Self {
        Self {
            url: url.into(),
            label,
        }
    }
}

/// Why a request was not enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierRejection {
    /// The URL was already enqueued during this run.
    Duplicate,
    /// The per-crawl request cap was reached.
    LimitReached,
    /// The frontier no longer accepts work.
    Closed,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<CrawlRequest>,
    enqueued_urls: HashSet<String>,
    in_flight: usize,
    closed: bool,
}

/// Concurrent FIFO frontier with request-level dedup and a request cap.
///
/// Workers call [`Frontier::next`] to take a request and
/// [`Frontier::complete`] once it has been fully processed. `next` returns
/// `None` once the queue is empty and no request is in flight, since only
/// in-flight requests can enqueue more work.
#[derive(Debug)]
pub struct Frontier {
    max_requests: usize,
    inner: Mutex<FrontierInner>,
    notify: Notify,
}

impl Frontier {
    pub fn new(max_requests: usize) -> Self {
        Self {
            max_requests,
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, request: CrawlRequest) -> Result<(), FrontierRejection> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(FrontierRejection::Closed);
            }
            if inner.enqueued_urls.contains(&request.url) {
                return Err(FrontierRejection::Duplicate);
            }
            if inner.enqueued_urls.len() >= self.max_requests {
                return Err(FrontierRejection::LimitReached);
            }
            inner.enqueued_urls.insert(request.url.clone());
            inner.queue.push_back(request);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Wait for the next request.
    ///
    /// Returns `None` when the frontier is drained, closed, or `cancel`
    /// fires while waiting.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<CrawlRequest> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(request) = inner.queue.pop_front() {
                    inner.in_flight += 1;
                    return Some(request);
                }
                if inner.in_flight == 0 {
                    return None;
                }
            }

            tokio::select! {
                () = &mut notified => {}
                () = cancel.cancelled() => return None,
            }
        }
    }

    /// Mark one request returned by [`Frontier::next`] as finished.
    pub fn complete(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Stop handing out and accepting requests; wakes every waiting worker.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn total_enqueued(&self) -> usize {
        self.lock().enqueued_urls.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn req(url: &str) -> CrawlRequest {
        CrawlRequest::new(url, None)
    }

    #[tokio::test]
    async fn fifo_order_and_drain() {
        let frontier = Frontier::new(10);
        let cancel = CancellationToken::new();
        frontier.push(req("https://a.com")).unwrap();
        frontier.push(req("https://b.com")).unwrap();

        assert_eq!(frontier.next(&cancel).await.unwrap().url, "https://a.com");
        frontier.complete();
        assert_eq!(frontier.next(&cancel).await.unwrap().url, "https://b.com");
        frontier.complete();
        assert!(frontier.next(&cancel).await.is_none());
    }

    #[test]
    fn rejects_duplicates_and_overflow() {
        let frontier = Frontier::new(2);
        frontier.push(req("https://a.com")).unwrap();
        assert_eq!(
            frontier.push(req("https://a.com")),
            Err(FrontierRejection::Duplicate)
        );
        frontier.push(req("https://b.com")).unwrap();
        assert_eq!(
            frontier.push(req("https://c.com")),
            Err(FrontierRejection::LimitReached)
        );
        assert_eq!(frontier.pending(), 2);
        assert_eq!(frontier.total_enqueued(), 2);
    }

    #[tokio::test]
    async fn waiter_wakes_when_in_flight_request_enqueues_more() {
        let frontier = Arc::new(Frontier::new(10));
        let cancel = CancellationToken::new();
        frontier.push(req("https://a.com")).unwrap();
        let first = frontier.next(&cancel).await.unwrap();
        assert_eq!(first.url, "https://a.com");
        assert_eq!(frontier.in_flight(), 1);

        let waiter = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move { frontier.next(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push(req("https://b.com")).unwrap();

        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.url, "https://b.com");
    }

    #[tokio::test]
    async fn waiter_returns_none_when_last_in_flight_completes() {
        let frontier = Arc::new(Frontier::new(10));
        let cancel = CancellationToken::new();
        frontier.push(req("https://a.com")).unwrap();
        frontier.next(&cancel).await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move { frontier.next(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.complete();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancellation_and_close_release_waiters() {
        let frontier = Frontier::new(10);
        let cancel = CancellationToken::new();
        frontier.push(req("https://a.com")).unwrap();
        frontier.next(&cancel).await.unwrap();

        cancel.cancel();
        assert!(frontier.next(&cancel).await.is_none());

        frontier.close();
        assert_eq!(
            frontier.push(req("https://b.com")),
            Err(FrontierRejection::Closed)
        );
    }
}
