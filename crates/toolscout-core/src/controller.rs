//! Crawl controller: drives the frontier to completion under a global
//! item budget with a bounded worker pool.
//!
//! ```text
//! seeds --classify--> Frontier --next--> worker slot (x concurrency)
//!                        ^                  | fetch (timeout, retries, cancel)
//!                        |                  v
//!                        +--follow-ups-- extractor --candidates--> normalize
//!                                                                   |
//!                                    CrawlState::try_accept <-------+
//!                                    (budget + seen-set, one lock) --> sink
//! ```
//!
//! The run ends when the frontier drains or the budget is exhausted.
//! Exhaustion cancels the run token: idle workers stop waiting, in-flight
//! fetches are abandoned and their results discarded.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::extract::{ExtractorRegistry, FollowUp, PageContext};
use crate::frontier::{CrawlRequest, Frontier, FrontierRejection};
use crate::models::{CrawlSummary, RawCandidate, Termination};
use crate::normalize::normalize;
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::route::classify_url;
use crate::state::{Acceptance, CrawlState};
use crate::traits::{DatasetSink, FetchRequest, Fetcher};

#[derive(Debug, Default)]
struct RunCounters {
    handled: AtomicUsize,
    failed: AtomicUsize,
    dropped: AtomicUsize,
}

/// Per-run context threaded through every handler call.
struct CrawlRun<'r, R: CrawlReporter> {
    state: CrawlState,
    frontier: Frontier,
    counters: RunCounters,
    reporter: &'r R,
}

enum FetchOutcome {
    Fetched(String),
    Failed { retries: u32, error: AppError },
    Cancelled,
}

/// Owns the fetch collaborator, output sink and extractor registry.
///
/// Generic over the fetcher and sink via traits, so tests run the full
/// controller without network access.
pub struct CrawlController<F, S>
where
    F: Fetcher,
    S: DatasetSink,
{
    fetcher: F,
    sink: S,
    extractors: ExtractorRegistry,
    config: CrawlConfig,
}

impl<F, S> CrawlController<F, S>
where
    F: Fetcher,
    S: DatasetSink,
{
    pub fn new(fetcher: F, sink: S, extractors: ExtractorRegistry, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            sink,
            extractors,
            config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `seed_urls` until the frontier drains or `max_items`
    /// records have been accepted.
    pub async fn start<R: CrawlReporter>(
        &self,
        seed_urls: &[String],
        max_items: usize,
        reporter: &R,
    ) -> CrawlSummary {
        self.start_with_shutdown(seed_urls, max_items, &CancellationToken::new(), reporter)
            .await
    }

    /// Like [`CrawlController::start`], additionally stopping early when
    /// `shutdown` is cancelled (e.g. on Ctrl-C).
    pub async fn start_with_shutdown<R: CrawlReporter>(
        &self,
        seed_urls: &[String],
        max_items: usize,
        shutdown: &CancellationToken,
        reporter: &R,
    ) -> CrawlSummary {
        let run_id = Uuid::new_v4();
        let run = CrawlRun {
            state: CrawlState::with_parent(max_items, shutdown),
            frontier: Frontier::new(self.config.max_requests(max_items, seed_urls.len())),
            counters: RunCounters::default(),
            reporter,
        };

        reporter.report(CrawlEvent::Started {
            run_id,
            seeds: seed_urls.len(),
            max_items,
        });

        for url in seed_urls {
            let label = classify_url(url);
            if let Err(rejection) = run.frontier.push(CrawlRequest::new(url.clone(), Some(label))) {
                tracing::debug!(%url, ?rejection, "Seed not enqueued");
            }
        }

        let workers = (0..self.config.concurrency.max(1)).map(|slot| self.worker(slot, &run));
        join_all(workers).await;
        run.frontier.close();
        tracing::debug!(
            enqueued = run.frontier.total_enqueued(),
            abandoned = run.frontier.pending(),
            "Frontier closed"
        );

        let termination = if run.state.is_exhausted() {
            Termination::BudgetExhausted
        } else if shutdown.is_cancelled() {
            Termination::Interrupted
        } else {
            Termination::FrontierExhausted
        };

        let summary = CrawlSummary {
            run_id,
            accepted: run.state.accepted(),
            max_items,
            requests_handled: run.counters.handled.load(Ordering::Relaxed),
            requests_failed: run.counters.failed.load(Ordering::Relaxed),
            requests_dropped: run.counters.dropped.load(Ordering::Relaxed),
            termination,
        };
        reporter.report(CrawlEvent::Finished { summary: &summary });
        summary
    }

    /// One worker slot: fetch-then-process, sequentially, until the frontier
    /// drains or the run is cancelled.
    async fn worker<R: CrawlReporter>(&self, slot: usize, run: &CrawlRun<'_, R>) {
        let cancel = run.state.cancel_token();

        while !cancel.is_cancelled() {
            let Some(request) = run.frontier.next(cancel).await else {
                break;
            };

            self.dispatch(request, run).await;
            run.frontier.complete();

            if cancel.is_cancelled() {
                break;
            }
            self.config.politeness.wait(cancel).await;
        }

        tracing::debug!(slot, "Worker stopped");
    }

    async fn dispatch<R: CrawlReporter>(&self, request: CrawlRequest, run: &CrawlRun<'_, R>) {
        let state = &run.state;

        if state.is_exhausted() {
            state.cancel_token().cancel();
            return;
        }

        let label = match request.label {
            Some(label) if label.is_routed() => label,
            _ => classify_url(&request.url),
        };

        let Some(extractor) = self.extractors.get(label) else {
            run.counters.dropped.fetch_add(1, Ordering::Relaxed);
            run.reporter.report(CrawlEvent::RequestDropped { url: &request.url });
            return;
        };

        run.reporter.report(CrawlEvent::RequestStarted {
            url: &request.url,
            label,
        });

        let mut fetch_request = FetchRequest::new(request.url.clone(), label);
        if let Some(plan) = extractor.scroll_plan(&request.url, state.remaining()) {
            fetch_request = fetch_request.with_scroll(plan);
        }

        let html = match self.fetch_with_retry(&fetch_request, state.cancel_token()).await {
            FetchOutcome::Fetched(html) => html,
            FetchOutcome::Cancelled => {
                tracing::debug!(url = %request.url, "Crawl stopped, abandoning in-flight request");
                return;
            }
            FetchOutcome::Failed { retries, error } => {
                run.counters.failed.fetch_add(1, Ordering::Relaxed);
                run.reporter.report(CrawlEvent::RequestFailed {
                    url: &request.url,
                    retries,
                    error: &error.to_string(),
                });
                return;
            }
        };

        if state.cancel_token().is_cancelled() {
            tracing::debug!(url = %request.url, "Crawl stopped, discarding fetched page");
            return;
        }
        run.counters.handled.fetch_add(1, Ordering::Relaxed);

        let page = PageContext {
            url: &request.url,
            label,
            html: &html,
            remaining_budget: state.remaining(),
        };
        let extraction = extractor.extract(&page);
        tracing::debug!(
            url = %request.url,
            candidates = extraction.candidate_count(),
            follow_ups = extraction.follow_ups.len(),
            "Page extracted"
        );

        self.accept_candidates(extractor.source(), &request.url, extraction.candidates, run)
            .await;
        self.enqueue_follow_ups(extraction.follow_ups, run);
    }

    /// Fetch with a per-attempt timeout and up to `max_retries` retries.
    /// Scroll sessions get the rendered timeout. Budget cancellation
    /// abandons the attempt immediately.
    async fn fetch_with_retry(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let policy = &self.config.retry;
        let timeout = self.config.timeout_for(request);
        let mut retries = 0;

        loop {
            let attempt = tokio::time::timeout(timeout, self.fetcher.fetch(request));
            let error = tokio::select! {
                biased;
                () = cancel.cancelled() => return FetchOutcome::Cancelled,
                result = attempt => match result {
                    Ok(Ok(html)) => return FetchOutcome::Fetched(html),
                    Ok(Err(e)) => e,
                    Err(_) => AppError::Timeout(timeout.as_secs()),
                },
            };

            if retries >= policy.max_retries {
                return FetchOutcome::Failed { retries, error };
            }
            retries += 1;
            tracing::warn!(
                url = %request.url,
                retry = retries,
                max_retries = policy.max_retries,
                retryable = error.is_retryable(),
                error = %error,
                "Fetch failed, retrying"
            );

            let delay = policy.delay_for_retry(retries);
            if !delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => return FetchOutcome::Cancelled,
                }
            }
        }
    }

    async fn accept_candidates<R: CrawlReporter>(
        &self,
        source: &str,
        page_url: &str,
        candidates: Vec<Result<RawCandidate, AppError>>,
        run: &CrawlRun<'_, R>,
    ) {
        let state = &run.state;

        for candidate in candidates {
            if state.cancel_token().is_cancelled() {
                break;
            }

            let raw = match candidate {
                Ok(raw) => raw,
                Err(e) => {
                    run.reporter.report(CrawlEvent::CandidateSkipped {
                        url: page_url,
                        error: &e.to_string(),
                    });
                    continue;
                }
            };

            let Some(tool) = normalize(&raw, source, page_url) else {
                tracing::trace!(name = %raw.name, "Candidate rejected by validation");
                continue;
            };

            match state.try_accept(&tool) {
                Acceptance::Accepted(accepted) => {
                    if let Err(e) = self.sink.append(&tool).await {
                        tracing::error!(name = %tool.name, error = %e, "Failed to append record");
                    }
                    run.reporter.report(CrawlEvent::RecordAccepted {
                        tool: &tool,
                        accepted,
                        max_items: state.max_items(),
                    });
                    if accepted >= state.max_items() {
                        run.reporter.report(CrawlEvent::BudgetExhausted { accepted });
                    }
                }
                Acceptance::Duplicate => {
                    tracing::trace!(name = %tool.name, "Duplicate tool skipped");
                }
                Acceptance::BudgetExhausted => break,
            }
        }
    }

    fn enqueue_follow_ups<R: CrawlReporter>(
        &self,
        follow_ups: Vec<FollowUp>,
        run: &CrawlRun<'_, R>,
    ) {
        let mut enqueued = 0usize;

        for follow_up in follow_ups {
            if run.state.is_exhausted() || run.state.cancel_token().is_cancelled() {
                break;
            }

            let label = follow_up
                .label
                .unwrap_or_else(|| classify_url(&follow_up.url));
            match run
                .frontier
                .push(CrawlRequest::new(follow_up.url, Some(label)))
            {
                Ok(()) => enqueued += 1,
                Err(FrontierRejection::Duplicate) => {}
                Err(rejection @ (FrontierRejection::LimitReached | FrontierRejection::Closed)) => {
                    tracing::debug!(?rejection, "Frontier refused follow-up requests");
                    break;
                }
            }
        }

        if enqueued > 0 {
            tracing::debug!(
                enqueued,
                pending = run.frontier.pending(),
                "Enqueued follow-up requests"
            );
        }
    }
}
