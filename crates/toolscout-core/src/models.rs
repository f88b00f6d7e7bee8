use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// A record as produced by a site extractor, before validation.
///
/// `url` may be relative to the page it was found on and `pricing` is free
/// text; the normalizer resolves and classifies both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub name: String,
    pub description: String,
    pub url: String,
    pub pricing: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl RawCandidate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_pricing(mut self, pricing: impl Into<String>) -> Self {
        self.pricing = Some(pricing.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

/// Closed pricing vocabulary, plus literal currency amounts such as `$29`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingTier {
    Free,
    Freemium,
    OpenSource,
    Paid,
    ContactForPricing,
    /// Currency symbol followed by digits, exactly as found in the source text.
    Amount(String),
}

impl PricingTier {
    pub fn as_str(&self) -> &str {
        match self {
            PricingTier::Free => "Free",
            PricingTier::Freemium => "Freemium",
            PricingTier::OpenSource => "Open Source",
            PricingTier::Paid => "Paid",
            PricingTier::ContactForPricing => "Contact for Pricing",
            PricingTier::Amount(amount) => amount,
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PricingTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical key used to detect duplicate tools within one crawl run.
///
/// Lowercased, trimmed name and URL joined by a newline. Cleaned names never
/// contain newlines, so the first newline always marks the end of the name
/// and two different pairs cannot produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(name: &str, url: &str) -> Self {
        Self(format!(
            "{}\n{}",
            name.trim().to_lowercase(),
            url.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated, canonical tool record ready for the output dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTool {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub source: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
}

impl NormalizedTool {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.name, &self.url)
    }
}

/// Why a crawl run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No pending or in-flight requests remained.
    FrontierExhausted,
    /// `maxItems` records were accepted.
    BudgetExhausted,
    /// An external shutdown signal stopped the run early.
    Interrupted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::FrontierExhausted => write!(f, "frontier exhausted"),
            Termination::BudgetExhausted => write!(f, "budget exhausted"),
            Termination::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Final report of a crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub run_id: Uuid,
    pub accepted: usize,
    pub max_items: usize,
    pub requests_handled: usize,
    pub requests_failed: usize,
    pub requests_dropped: usize,
    pub termination: Termination,
}
