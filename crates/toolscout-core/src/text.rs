//! Pure text helpers: whitespace cleanup, pricing and topic inference, and
//! URL resolution against the page a link was found on.
//!
//! Pricing and tag inference are keyword-substring heuristics over free text
//! and are approximate by nature; only the precedence rules are guaranteed.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::PricingTier;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static CURRENCY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$€£]\s*\d+").expect("valid regex"));

/// Controlled topic vocabulary. Its order defines the order of inferred tags.
pub const TOPIC_VOCABULARY: &[&str] = &[
    "machine learning",
    "nlp",
    "natural language processing",
    "computer vision",
    "image generation",
    "text generation",
    "chatbot",
    "automation",
    "productivity",
    "writing",
    "coding",
    "design",
    "marketing",
    "seo",
    "sales",
    "data analysis",
    "video",
    "audio",
    "translation",
    "summarization",
];

/// Collapse every run of whitespace (spaces, newlines, tabs) into a single
/// space and trim both ends.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Infer a pricing tier from free text.
///
/// Checked in order: `free` (when `freemium` is absent), `freemium`,
/// `open source`/`opensource`, a currency symbol (literal amount when a
/// symbol+digits pattern exists, otherwise `Paid`), `subscription` or
/// `premium`, then `contact`.
pub fn infer_pricing(text: &str) -> Option<PricingTier> {
    let lower = text.to_lowercase();

    if lower.contains("free") && !lower.contains("freemium") {
        return Some(PricingTier::Free);
    }
    if lower.contains("freemium") {
        return Some(PricingTier::Freemium);
    }
    if lower.contains("open source") || lower.contains("opensource") {
        return Some(PricingTier::OpenSource);
    }
    if lower.contains(['$', '€', '£']) {
        return Some(match CURRENCY_AMOUNT.find(text) {
            Some(m) => PricingTier::Amount(m.as_str().to_string()),
            None => PricingTier::Paid,
        });
    }
    if lower.contains("subscription") || lower.contains("premium") {
        return Some(PricingTier::Paid);
    }
    if lower.contains("contact") {
        return Some(PricingTier::ContactForPricing);
    }
    None
}

/// Scan text for phrases of [`TOPIC_VOCABULARY`] and return the matches in
/// title case, without duplicates, in vocabulary order.
pub fn infer_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for topic in TOPIC_VOCABULARY {
        if lower.contains(topic) {
            let tag = title_case(topic);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    tags
}

fn title_case(phrase: &str) -> String {
    phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `href` against the URL of the page it was found on.
///
/// - absolute `http(s)://` links pass through unchanged
/// - protocol-relative `//host/path` links gain `https:`
/// - root-relative `/path` links resolve against the origin of `base_url`
/// - anything else uses standard relative resolution against `base_url`
///
/// An empty `href` resolves to `base_url` itself. Returns `None` when the
/// base cannot be parsed or the result is not a URL.
pub fn extract_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return Some(base_url.to_string());
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    if href.starts_with("//") {
        return Some(format!("https:{href}"));
    }

    let base = Url::parse(base_url).ok()?;

    if href.starts_with('/') {
        let host = base.host_str()?;
        let port = base.port().map(|p| format!(":{p}")).unwrap_or_default();
        return Some(format!("{}://{host}{port}{href}", base.scheme()));
    }

    base.join(href).ok().map(String::from)
}

/// Basic syntax check for an absolute web URL: it must parse, use `http` or
/// `https`, and name a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
