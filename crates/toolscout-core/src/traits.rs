use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AppError;
use crate::models::NormalizedTool;
use crate::route::RouteLabel;
use crate::scroll::ScrollPlan;

/// A single page fetch handed to the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub label: RouteLabel,
    /// Present when the extractor needs a live-rendered, scrolled page.
    pub scroll: Option<ScrollPlan>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, label: RouteLabel) -> Self {
        Self {
            url: url.into(),
            label,
            scroll: None,
        }
    }

    pub fn with_scroll(mut self, plan: ScrollPlan) -> Self {
        self.scroll = Some(plan);
        self
    }
}

/// Fetches page content (static HTML or a rendered DOM snapshot).
///
/// Implementations own header shaping, proxies and their own transport
/// timeouts; retries belong to the crawl controller.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Append-only output dataset.
pub trait DatasetSink: Send + Sync + Clone {
    fn append(&self, tool: &NormalizedTool) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A sink that keeps records in memory, in append order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<NormalizedTool>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<NormalizedTool> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DatasetSink for MemorySink {
    async fn append(&self, tool: &NormalizedTool) -> Result<(), AppError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tool.clone());
        Ok(())
    }
}
