use std::collections::HashSet;

use chrono::Utc;

use crate::models::{DedupKey, NormalizedTool, RawCandidate};
use crate::text::{clean_text, extract_url, infer_pricing, is_valid_url};

/// Minimum length (in characters) of a cleaned tool name.
pub const MIN_NAME_LEN: usize = 2;

/// Minimum length (in characters) of a cleaned tool description.
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Validate and canonicalize a raw candidate.
///
/// Cleans name, description and category, resolves the URL against
/// `source_url`, classifies free-text pricing and deduplicates tags.
/// Returns `None` (a silent rejection) when the name is shorter than
/// [`MIN_NAME_LEN`], the description shorter than [`MIN_DESCRIPTION_LEN`],
/// or the resolved URL is not a valid web URL.
pub fn normalize(raw: &RawCandidate, source: &str, source_url: &str) -> Option<NormalizedTool> {
    let name = clean_text(&raw.name);
    if name.chars().count() < MIN_NAME_LEN {
        return None;
    }

    let description = clean_text(&raw.description);
    if description.chars().count() < MIN_DESCRIPTION_LEN {
        return None;
    }

    let url = extract_url(&raw.url, source_url)?;
    if !is_valid_url(&url) {
        return None;
    }

    let category = raw
        .category
        .as_deref()
        .map(clean_text)
        .filter(|c| !c.is_empty());

    let tags = raw.tags.as_ref().map(|t| dedup_tags(t)).filter(|t| !t.is_empty());

    Some(NormalizedTool {
        name,
        description,
        url,
        pricing: raw.pricing.as_deref().and_then(infer_pricing),
        category,
        tags,
        source: source.to_string(),
        source_url: source_url.to_string(),
        scraped_at: Utc::now(),
    })
}

fn dedup_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| clean_text(t))
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

/// Pure membership check of the tool's [`DedupKey`] against a seen-set.
///
/// Callers that accept the tool must insert the key before yielding to
/// other workers; [`crate::state::CrawlState::try_accept`] does both under
/// one lock.
pub fn is_duplicate(tool: &NormalizedTool, seen: &HashSet<DedupKey>) -> bool {
    seen.contains(&tool.dedup_key())
}
