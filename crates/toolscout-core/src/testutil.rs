//! Test utilities: mock implementations of the crawl seams.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::AppError;
use crate::extract::{ExtractorRegistry, FollowUp, PageContext, PageExtraction, SiteExtractor};
use crate::models::{NormalizedTool, RawCandidate};
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::route::RouteLabel;
use crate::scroll::ScrollPlan;
use crate::traits::{FetchRequest, Fetcher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that records every request and returns a placeholder page.
///
/// URLs registered with [`MockFetcher::failing`] return a network error
/// for their first `n` attempts; URLs registered with [`MockFetcher::slow`]
/// take that long instead of the shared delay.
#[derive(Clone, Default)]
pub struct MockFetcher {
    failures: Arc<Mutex<HashMap<String, u32>>>,
    slow_urls: Arc<Mutex<HashMap<String, Duration>>>,
    delay: Option<Duration>,
    pub calls: Arc<Mutex<Vec<FetchRequest>>>,
    started: Arc<Mutex<Vec<Instant>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, url: &str, attempts: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), attempts);
        self
    }

    pub fn slow(self, url: &str, delay: Duration) -> Self {
        self.slow_urls
            .lock()
            .unwrap()
            .insert(url.to_string(), delay);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requested_labels(&self) -> Vec<RouteLabel> {
        self.calls.lock().unwrap().iter().map(|r| r.label).collect()
    }

    /// When each fetch attempt started, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(request.clone());
        self.started.lock().unwrap().push(Instant::now());

        let delay = self
            .slow_urls
            .lock()
            .unwrap()
            .get(&request.url)
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&request.url)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(AppError::NetworkError(format!(
                    "connection reset: {}",
                    request.url
                )));
            }
        }

        Ok(format!("<html><body>{}</body></html>", request.url))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// What the mock extractor yields for one page URL.
#[derive(Clone, Default)]
pub struct PageSpec {
    candidates: Vec<Result<RawCandidate, String>>,
    follow_ups: Vec<FollowUp>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(mut self, raw: RawCandidate) -> Self {
        self.candidates.push(Ok(raw));
        self
    }

    pub fn failed_candidate(mut self, reason: &str) -> Self {
        self.candidates.push(Err(reason.to_string()));
        self
    }

    pub fn follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_ups.push(follow_up);
        self
    }
}

/// Mock extractor keyed by page URL; unknown pages yield nothing.
#[derive(Clone)]
pub struct MockExtractor {
    source: String,
    pages: Arc<HashMap<String, PageSpec>>,
    scroll: Option<(String, usize)>,
}

impl MockExtractor {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            pages: Arc::new(HashMap::new()),
            scroll: None,
        }
    }

    pub fn with_page(mut self, url: &str, spec: PageSpec) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), spec);
        self
    }

    /// Request scrolling with the remaining budget as the item target.
    pub fn with_scroll_plan(mut self, selector: &str, batch: usize) -> Self {
        self.scroll = Some((selector.to_string(), batch));
        self
    }
}

impl SiteExtractor for MockExtractor {
    fn source(&self) -> &str {
        &self.source
    }

    fn scroll_plan(&self, _url: &str, remaining_budget: usize) -> Option<ScrollPlan> {
        self.scroll
            .as_ref()
            .map(|(selector, batch)| ScrollPlan::new(selector.clone(), *batch, remaining_budget))
    }

    fn extract(&self, page: &PageContext<'_>) -> PageExtraction {
        let Some(spec) = self.pages.get(page.url) else {
            return PageExtraction::default();
        };
        PageExtraction {
            candidates: spec
                .candidates
                .iter()
                .map(|c| c.clone().map_err(AppError::ExtractionError))
                .collect(),
            follow_ups: spec.follow_ups.clone(),
        }
    }
}

/// Registry serving the same mock for every routed label.
pub fn registry_of(extractor: &MockExtractor) -> ExtractorRegistry {
    ExtractorRegistry::new(
        Box::new(extractor.clone()),
        Box::new(extractor.clone()),
        Box::new(extractor.clone()),
    )
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock crawl reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == label)
            .count()
    }
}

impl CrawlReporter for MockReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let label = match &event {
            CrawlEvent::Started { .. } => "Started",
            CrawlEvent::RequestStarted { .. } => "RequestStarted",
            CrawlEvent::RequestDropped { .. } => "RequestDropped",
            CrawlEvent::RequestFailed { .. } => "RequestFailed",
            CrawlEvent::CandidateSkipped { .. } => "CandidateSkipped",
            CrawlEvent::RecordAccepted { .. } => "RecordAccepted",
            CrawlEvent::BudgetExhausted { .. } => "BudgetExhausted",
            CrawlEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a normalized record for testing.
pub fn make_test_tool(name: &str) -> NormalizedTool {
    NormalizedTool {
        name: name.to_string(),
        description: "A tool that does things".into(),
        url: format!("https://{}.ai/", name.to_lowercase()),
        pricing: None,
        category: None,
        tags: None,
        source: "Test".into(),
        source_url: "https://example.com/".into(),
        scraped_at: Utc::now(),
    }
}
