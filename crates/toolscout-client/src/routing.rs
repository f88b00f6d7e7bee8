use toolscout_core::error::AppError;
use toolscout_core::traits::{FetchRequest, Fetcher};

/// Sends requests that carry a scroll plan to a rendering fetcher and
/// everything else to a plain HTTP fetcher.
#[derive(Clone)]
pub struct RoutingFetcher<H, R> {
    http: H,
    rendered: R,
}

impl<H, R> RoutingFetcher<H, R>
where
    H: Fetcher,
    R: Fetcher,
{
    pub fn new(http: H, rendered: R) -> Self {
        Self { http, rendered }
    }
}

impl<H, R> Fetcher for RoutingFetcher<H, R>
where
    H: Fetcher,
    R: Fetcher,
{
    async fn fetch(&self, request: &FetchRequest) -> Result<String, AppError> {
        if request.scroll.is_some() {
            self.rendered.fetch(request).await
        } else {
            self.http.fetch(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use toolscout_core::route::RouteLabel;
    use toolscout_core::scroll::ScrollPlan;

    use super::*;

    #[derive(Clone)]
    struct Fixed(&'static str);

    impl Fetcher for Fixed {
        async fn fetch(&self, _request: &FetchRequest) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn scroll_requests_go_to_renderer() {
        let fetcher = RoutingFetcher::new(Fixed("http"), Fixed("rendered"));

        let plain = FetchRequest::new(
            "https://www.producthunt.com/posts/alpha",
            RouteLabel::ProductHuntDetail,
        );
        let scrolled = FetchRequest::new(
            "https://theresanaiforthat.com/ai/",
            RouteLabel::TheresAnAiForThat,
        )
        .with_scroll(ScrollPlan::new(".tool-card", 50, 100));

        assert_eq!(fetcher.fetch(&plain).await.unwrap(), "http");
        assert_eq!(fetcher.fetch(&scrolled).await.unwrap(), "rendered");
    }
}
