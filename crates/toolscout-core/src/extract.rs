//! Contract between the crawl controller and site-specific extractors.

use crate::error::AppError;
use crate::models::RawCandidate;
use crate::route::RouteLabel;
use crate::scroll::ScrollPlan;

/// A fetched page handed to an extractor.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub url: &'a str,
    pub label: RouteLabel,
    pub html: &'a str,
    /// Records the crawl may still accept; bounds follow-up fan-out.
    pub remaining_budget: usize,
}

/// A URL the extractor wants crawled next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub url: String,
    /// Explicit label; `None` re-derives it from the URL shape.
    pub label: Option<RouteLabel>,
}

impl FollowUp {
    pub fn labeled(url: impl Into<String>, label: RouteLabel) -> Self {
        Self {
            url: url.into(),
            label: Some(label),
        }
    }

    pub fn unlabeled(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
        }
    }
}

/// Everything one page visit produced.
///
/// A candidate that failed to extract is an `Err` entry; its siblings are
/// still processed.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub candidates: Vec<Result<RawCandidate, AppError>>,
    pub follow_ups: Vec<FollowUp>,
}

impl PageExtraction {
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

/// Site-specific extraction logic.
///
/// Extraction runs synchronously over content that has already been
/// fetched (and, for rendered pages, fully scrolled).
pub trait SiteExtractor: Send + Sync {
    /// Name of the originating site, stored on every record.
    fn source(&self) -> &str;

    /// Scroll plan for pages that load items lazily; `None` for static pages.
    fn scroll_plan(&self, url: &str, remaining_budget: usize) -> Option<ScrollPlan> {
        let _ = (url, remaining_budget);
        None
    }

    fn extract(&self, page: &PageContext<'_>) -> PageExtraction;
}

/// Total mapping from routed labels to extractors.
pub struct ExtractorRegistry {
    theresanaiforthat: Box<dyn SiteExtractor>,
    producthunt_list: Box<dyn SiteExtractor>,
    producthunt_detail: Box<dyn SiteExtractor>,
}

impl ExtractorRegistry {
    pub fn new(
        theresanaiforthat: Box<dyn SiteExtractor>,
        producthunt_list: Box<dyn SiteExtractor>,
        producthunt_detail: Box<dyn SiteExtractor>,
    ) -> Self {
        Self {
            theresanaiforthat,
            producthunt_list,
            producthunt_detail,
        }
    }

    /// Extractor for a label; `None` only for [`RouteLabel::Unrouted`].
    pub fn get(&self, label: RouteLabel) -> Option<&dyn SiteExtractor> {
        match label {
            RouteLabel::TheresAnAiForThat => Some(self.theresanaiforthat.as_ref()),
            RouteLabel::ProductHuntList => Some(self.producthunt_list.as_ref()),
            RouteLabel::ProductHuntDetail => Some(self.producthunt_detail.as_ref()),
            RouteLabel::Unrouted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl SiteExtractor for Named {
        fn source(&self) -> &str {
            self.0
        }

        fn extract(&self, _page: &PageContext<'_>) -> PageExtraction {
            PageExtraction::default()
        }
    }

    #[test]
    fn registry_maps_every_routed_label() {
        let registry = ExtractorRegistry::new(
            Box::new(Named("a")),
            Box::new(Named("b")),
            Box::new(Named("c")),
        );

        assert_eq!(registry.get(RouteLabel::TheresAnAiForThat).unwrap().source(), "a");
        assert_eq!(registry.get(RouteLabel::ProductHuntList).unwrap().source(), "b");
        assert_eq!(registry.get(RouteLabel::ProductHuntDetail).unwrap().source(), "c");
        assert!(registry.get(RouteLabel::Unrouted).is_none());
    }

    #[test]
    fn default_scroll_plan_is_none() {
        assert!(Named("a").scroll_plan("https://example.com", 10).is_none());
    }
}
