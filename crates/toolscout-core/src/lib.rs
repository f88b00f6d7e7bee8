pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod models;
pub mod normalize;
pub mod politeness;
pub mod reporter;
pub mod route;
pub mod scroll;
pub mod state;
pub mod text;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{CrawlConfig, CrawlInput, RetryPolicy};
pub use controller::CrawlController;
pub use error::AppError;
pub use extract::{ExtractorRegistry, FollowUp, PageContext, PageExtraction, SiteExtractor};
pub use models::{CrawlSummary, NormalizedTool, PricingTier, RawCandidate, Termination};
pub use reporter::{CrawlEvent, CrawlReporter, TracingCrawlReporter};
pub use route::{RouteLabel, classify_url};
pub use scroll::{ScrollDriver, ScrollOutcome, ScrollPlan, run_scroll};
pub use traits::{DatasetSink, FetchRequest, Fetcher, MemorySink};
