//! Product Hunt: topic listings fan out to product detail pages, and each
//! detail page yields at most one tool.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use toolscout_core::error::AppError;
use toolscout_core::extract::{FollowUp, PageContext, PageExtraction, SiteExtractor};
use toolscout_core::models::RawCandidate;
use toolscout_core::route::RouteLabel;
use toolscout_core::text::{clean_text, extract_url, infer_tags};

use super::{element_text, first_attr, first_text, same_host_links, selector};

pub const SOURCE: &str = "ProductHunt";
pub const CATEGORY: &str = "Artificial Intelligence";
const PAGINATION_LIMIT: usize = 3;

static POST_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/posts/[\w-]+$").expect("valid post regex"));

/// Listing pages produce no records, only follow-up requests.
pub struct ProductHuntListExtractor {
    post_links: Selector,
    content_links: Selector,
    pagination: Selector,
}

impl ProductHuntListExtractor {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            post_links: selector(r#"a[href*="/posts/"]"#)?,
            content_links: selector(r#"#content ul li a, [id*="content"] ul li a"#)?,
            pagination: selector(r#"a[href*="page"], .pagination a, a[rel="next"]"#)?,
        })
    }

    fn detail_links(&self, document: &Html, page_url: &str) -> Vec<String> {
        let posts = document
            .select(&self.post_links)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| POST_HREF.is_match(href));
        let listed = document
            .select(&self.content_links)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.contains("/posts/"));

        let mut links: Vec<String> = Vec::new();
        for href in posts.chain(listed) {
            if let Some(url) = extract_url(href, page_url)
                && !links.contains(&url)
            {
                links.push(url);
            }
        }
        links
    }
}

impl SiteExtractor for ProductHuntListExtractor {
    fn source(&self) -> &str {
        SOURCE
    }

    fn extract(&self, page: &PageContext<'_>) -> PageExtraction {
        let document = Html::parse_document(page.html);

        let details = self.detail_links(&document, page.url);
        tracing::info!(url = %page.url, links = details.len(), "Found product detail links");

        let mut follow_ups: Vec<FollowUp> = details
            .into_iter()
            .take(page.remaining_budget)
            .map(|url| FollowUp::labeled(url, RouteLabel::ProductHuntDetail))
            .collect();

        if page.remaining_budget > 0 {
            follow_ups.extend(
                same_host_links(&document, &self.pagination, page.url, PAGINATION_LIMIT)
                    .into_iter()
                    .map(|url| FollowUp::labeled(url, RouteLabel::ProductHuntList)),
            );
        }

        PageExtraction {
            candidates: Vec::new(),
            follow_ups,
        }
    }
}

/// Detail pages describe a single product.
pub struct ProductHuntDetailExtractor {
    heading: Selector,
    title: Selector,
    tagline: Selector,
    meta_description: Selector,
    og_description: Selector,
    paragraph: Selector,
    website: Selector,
    og_url: Selector,
    body: Selector,
    topics: Selector,
}

impl ProductHuntDetailExtractor {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            heading: selector("h1")?,
            title: selector(r#"[class*="product-name"], [class*="title"]"#)?,
            tagline: selector(r#"[class*="tagline"]"#)?,
            meta_description: selector(r#"meta[name="description"]"#)?,
            og_description: selector(r#"meta[property="og:description"]"#)?,
            paragraph: selector("p")?,
            website: selector(r#"a[href*="http"]:not([href*="producthunt.com"])"#)?,
            og_url: selector(r#"meta[property="og:url"]"#)?,
            body: selector("body")?,
            topics: selector(r#"[class*="topic"], [class*="tag"], [class*="badge"]"#)?,
        })
    }

    fn product(&self, document: &Html) -> Result<RawCandidate, AppError> {
        let root = document.root_element();

        let name = Some(first_text(root, &self.heading))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| first_text(root, &self.title));

        let description = [
            first_text(root, &self.tagline),
            first_attr(document, &self.meta_description, "content"),
            first_attr(document, &self.og_description, "content"),
            first_text(root, &self.paragraph),
        ]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default();

        let url = Some(first_attr(document, &self.website, "href"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| first_attr(document, &self.og_url, "content"));

        if name.is_empty()
            || description.is_empty()
            || url.is_empty()
            || url.contains("producthunt.com")
        {
            let name = if name.is_empty() { "unknown" } else { &name };
            return Err(AppError::ExtractionError(format!(
                "incomplete product data for {name}"
            )));
        }

        let body_text = document
            .select(&self.body)
            .next()
            .map(|b| b.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let mut tags: Vec<String> = document
            .select(&self.topics)
            .map(element_text)
            .filter(|t| (3..50).contains(&t.chars().count()))
            .collect();
        if tags.is_empty() {
            tags = infer_tags(&body_text);
        }

        let mut product = RawCandidate::new(name, description, url).with_category(CATEGORY);
        let pricing = clean_text(&body_text);
        if !pricing.is_empty() {
            product = product.with_pricing(pricing);
        }
        if !tags.is_empty() {
            product = product.with_tags(tags);
        }
        Ok(product)
    }
}

impl SiteExtractor for ProductHuntDetailExtractor {
    fn source(&self) -> &str {
        SOURCE
    }

    fn extract(&self, page: &PageContext<'_>) -> PageExtraction {
        let document = Html::parse_document(page.html);
        PageExtraction {
            candidates: vec![self.product(&document)],
            follow_ups: Vec::new(),
        }
    }
}
