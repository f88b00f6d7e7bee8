use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Selects which site extractor handles a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteLabel {
    /// theresanaiforthat.com listing pages (infinite scroll).
    TheresAnAiForThat,
    /// Product Hunt topic and listing pages.
    ProductHuntList,
    /// Product Hunt `/posts/<slug>` detail pages.
    ProductHuntDetail,
    /// No extractor matches the URL.
    Unrouted,
}

impl RouteLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteLabel::TheresAnAiForThat => "theresanaiforthat",
            RouteLabel::ProductHuntList => "producthunt_list",
            RouteLabel::ProductHuntDetail => "producthunt_detail",
            RouteLabel::Unrouted => "unrouted",
        }
    }

    pub fn is_routed(&self) -> bool {
        !matches!(self, RouteLabel::Unrouted)
    }
}

impl fmt::Display for RouteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RouteLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "theresanaiforthat" => Ok(RouteLabel::TheresAnAiForThat),
            "producthunt_list" => Ok(RouteLabel::ProductHuntList),
            "producthunt_detail" => Ok(RouteLabel::ProductHuntDetail),
            "unrouted" => Ok(RouteLabel::Unrouted),
            _ => Err(format!("Unknown route label: {s}")),
        }
    }
}

/// Derive a route label from the shape of a URL (domain + path pattern).
pub fn classify_url(url: &str) -> RouteLabel {
    let lower = url.to_lowercase();

    if lower.contains("theresanaiforthat.com") {
        return RouteLabel::TheresAnAiForThat;
    }
    if lower.contains("producthunt.com") {
        if lower.contains("/posts/") {
            return RouteLabel::ProductHuntDetail;
        }
        return RouteLabel::ProductHuntList;
    }

    RouteLabel::Unrouted
}
