use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use toolscout_core::error::AppError;
use toolscout_core::extract::{FollowUp, PageContext, PageExtraction, SiteExtractor};
use toolscout_core::models::RawCandidate;
use toolscout_core::route::RouteLabel;
use toolscout_core::scroll::ScrollPlan;

use super::{first_text, same_host_links, selector};

pub const SOURCE: &str = "TheresAnAIForThat";
const ITEM_SELECTOR: &str = ".tool-card";
const ITEMS_PER_BATCH: usize = 50;
const SETTLE: Duration = Duration::from_millis(1500);
const PAGINATION_LIMIT: usize = 10;

static SLUG_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"theresanaiforthat\.com/[a-z0-9-]+(?:\?|$)").expect("valid slug regex")
});

/// Listing pages under `/ai/` and single-slug task pages load tools by
/// infinite scroll and have no pagination worth following.
fn is_infinite_scroll_page(url: &str) -> bool {
    url.contains("/ai/") || SLUG_PAGE.is_match(url)
}

/// Extractor for TheresAnAIForThat listing pages.
///
/// Every `.tool-card` on the (scrolled) page becomes one candidate.
pub struct TheresAnAiForThatExtractor {
    card: Selector,
    name: Selector,
    description: Selector,
    link: Selector,
    category: Selector,
    pagination: Selector,
}

impl TheresAnAiForThatExtractor {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            card: selector(ITEM_SELECTOR)?,
            name: selector(r#"[class*="tool-name"]"#)?,
            description: selector(r#"[class*="tool-description"]"#)?,
            link: selector("a")?,
            category: selector(r#"[class*="task_label"]"#)?,
            pagination: selector(r#"a[href*="page"], a[href*="?p="], .pagination a, a.next"#)?,
        })
    }

    fn card_candidate(&self, card: ElementRef<'_>, index: usize) -> Result<RawCandidate, AppError> {
        let name = first_text(card, &self.name);
        let description = first_text(card, &self.description);
        let url = card
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if name.is_empty() || description.is_empty() || url.is_empty() {
            return Err(AppError::ExtractionError(format!(
                "tool card {index} is missing a name, description or link"
            )));
        }

        let mut candidate = RawCandidate::new(name, description, url);
        let category = first_text(card, &self.category);
        if !category.is_empty() {
            candidate = candidate.with_category(category);
        }
        Ok(candidate)
    }
}

impl SiteExtractor for TheresAnAiForThatExtractor {
    fn source(&self) -> &str {
        SOURCE
    }

    fn scroll_plan(&self, _url: &str, remaining_budget: usize) -> Option<ScrollPlan> {
        Some(ScrollPlan::new(ITEM_SELECTOR, ITEMS_PER_BATCH, remaining_budget).with_settle(SETTLE))
    }

    fn extract(&self, page: &PageContext<'_>) -> PageExtraction {
        let document = Html::parse_document(page.html);

        let candidates: Vec<_> = document
            .select(&self.card)
            .enumerate()
            .map(|(index, card)| self.card_candidate(card, index))
            .collect();
        tracing::info!(url = %page.url, cards = candidates.len(), "Extracted tool cards");

        let follow_ups = if page.remaining_budget > 0 && !is_infinite_scroll_page(page.url) {
            same_host_links(&document, &self.pagination, page.url, PAGINATION_LIMIT)
                .into_iter()
                .map(|url| FollowUp::labeled(url, RouteLabel::TheresAnAiForThat))
                .collect()
        } else {
            Vec::new()
        };

        PageExtraction {
            candidates,
            follow_ups,
        }
    }
}
