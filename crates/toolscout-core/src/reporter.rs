use uuid::Uuid;

use crate::models::{CrawlSummary, NormalizedTool};
use crate::route::RouteLabel;

/// Events emitted by the crawl controller for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Started {
        run_id: Uuid,
        seeds: usize,
        max_items: usize,
    },
    RequestStarted {
        url: &'a str,
        label: RouteLabel,
    },
    /// No extractor could be derived for the URL.
    RequestDropped {
        url: &'a str,
    },
    /// Fetching failed on every attempt; the request is abandoned.
    RequestFailed {
        url: &'a str,
        retries: u32,
        error: &'a str,
    },
    /// One candidate on a page could not be extracted.
    CandidateSkipped {
        url: &'a str,
        error: &'a str,
    },
    RecordAccepted {
        tool: &'a NormalizedTool,
        accepted: usize,
        max_items: usize,
    },
    BudgetExhausted {
        accepted: usize,
    },
    Finished {
        summary: &'a CrawlSummary,
    },
}

/// Trait for receiving crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Started {
                run_id,
                seeds,
                max_items,
            } => {
                tracing::info!(%run_id, %seeds, %max_items, "Crawl started");
            }
            CrawlEvent::RequestStarted { url, label } => {
                tracing::info!(%url, %label, "Handling request");
            }
            CrawlEvent::RequestDropped { url } => {
                tracing::warn!(%url, "Could not determine extractor for URL, dropping request");
            }
            CrawlEvent::RequestFailed {
                url,
                retries,
                error,
            } => {
                tracing::error!(%url, %retries, %error, "Request failed after retries");
            }
            CrawlEvent::CandidateSkipped { url, error } => {
                tracing::debug!(%url, %error, "Skipping candidate");
            }
            CrawlEvent::RecordAccepted {
                tool,
                accepted,
                max_items,
            } => {
                if accepted <= 10 || accepted % 10 == 0 {
                    tracing::info!(name = %tool.name, source = %tool.source, "Scraped tool ({accepted}/{max_items})");
                } else {
                    tracing::debug!(name = %tool.name, source = %tool.source, "Scraped tool ({accepted}/{max_items})");
                }
            }
            CrawlEvent::BudgetExhausted { accepted } => {
                tracing::info!(%accepted, "Max items reached, stopping crawl");
            }
            CrawlEvent::Finished { summary } => {
                tracing::info!(
                    run_id = %summary.run_id,
                    accepted = %summary.accepted,
                    handled = %summary.requests_handled,
                    failed = %summary.requests_failed,
                    dropped = %summary.requests_dropped,
                    termination = %summary.termination,
                    "Crawl completed"
                );
            }
        }
    }
}
