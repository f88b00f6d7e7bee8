#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod fetcher;
pub mod headers;
pub mod routing;
pub mod sites;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use fetcher::ReqwestFetcher;
pub use routing::RoutingFetcher;
pub use sites::{
    ProductHuntDetailExtractor, ProductHuntListExtractor, TheresAnAiForThatExtractor,
    default_registry,
};
