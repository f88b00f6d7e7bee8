//! Site extractors for the supported AI-tool directories.

use scraper::{ElementRef, Html, Selector};
use toolscout_core::error::AppError;
use toolscout_core::extract::ExtractorRegistry;
use toolscout_core::text::{clean_text, extract_url};
use url::Url;

pub mod producthunt;
pub mod theresanaiforthat;

pub use producthunt::{ProductHuntDetailExtractor, ProductHuntListExtractor};
pub use theresanaiforthat::TheresAnAiForThatExtractor;

/// Registry wiring every routed label to its site extractor.
pub fn default_registry() -> Result<ExtractorRegistry, AppError> {
    Ok(ExtractorRegistry::new(
        Box::new(TheresAnAiForThatExtractor::new()?),
        Box::new(ProductHuntListExtractor::new()?),
        Box::new(ProductHuntDetailExtractor::new()?),
    ))
}

pub(crate) fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ExtractionError(format!("Invalid selector `{css}`: {e}")))
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text of the first match of `selector` under `scope`, or empty.
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

pub(crate) fn first_attr(document: &Html, selector: &Selector, attr: &str) -> String {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(clean_text)
        .unwrap_or_default()
}

/// Links matched by `selector`, resolved against `page_url`, restricted to
/// the page's host, deduplicated and capped at `limit`.
pub(crate) fn same_host_links(
    document: &Html,
    selector: &Selector,
    page_url: &str,
    limit: usize,
) -> Vec<String> {
    let Some(host) = host_of(page_url) else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for href in document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
    {
        if links.len() >= limit {
            break;
        }
        let Some(resolved) = extract_url(href, page_url) else {
            continue;
        };
        if resolved == page_url || links.contains(&resolved) {
            continue;
        }
        if host_of(&resolved).as_deref() == Some(host.as_str()) {
            links.push(resolved);
        }
    }
    links
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_stay_on_host_and_respect_limit() {
        let html = Html::parse_document(
            r#"<div class="pagination">
                <a href="/ai/?page=2">2</a>
                <a href="/ai/?page=2">2 again</a>
                <a href="https://elsewhere.com/?page=3">off-site</a>
                <a href="?page=3">3</a>
                <a href="?page=4">4</a>
            </div>"#,
        );
        let links = same_host_links(
            &html,
            &selector(".pagination a").unwrap(),
            "https://theresanaiforthat.com/ai/",
            2,
        );

        assert_eq!(
            links,
            vec![
                "https://theresanaiforthat.com/ai/?page=2".to_string(),
                "https://theresanaiforthat.com/ai/?page=3".to_string(),
            ]
        );
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(matches!(
            selector("a[href="),
            Err(AppError::ExtractionError(_))
        ));
        assert!(matches!(selector("["), Err(AppError::ExtractionError(_))));
    }

    #[test]
    fn default_registry_builds() {
        assert!(default_registry().is_ok());
    }
}
