use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use toolscout_core::error::AppError;
use toolscout_core::scroll::{ScrollDriver, ScrollPlan, run_scroll};
use toolscout_core::traits::{FetchRequest, Fetcher};

const SELECTOR_POLL: Duration = Duration::from_millis(500);

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before returning the HTML. When the request carries a
/// [`ScrollPlan`], the page is scrolled until the plan's state machine
/// finishes, then the DOM is snapshotted once.
///
/// A single Chromium process is shared across all clones of this struct;
/// each [`Fetcher::fetch`] call opens a new tab and closes it afterwards,
/// including when the fetch is timed out or abandoned.
///
/// # Example
///
/// ```rust,no_run
/// use toolscout_client::BrowserFetcher;
/// use toolscout_core::route::RouteLabel;
/// use toolscout_core::scroll::ScrollPlan;
/// use toolscout_core::traits::{FetchRequest, Fetcher};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::new().await?;
/// let request = FetchRequest::new("https://theresanaiforthat.com/ai/", RouteLabel::TheresAnAiForThat)
///     .with_scroll(ScrollPlan::new(".tool-card", 50, 100));
/// let html = fetcher.fetch(&request).await?;
/// println!("{}", &html[..200]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launches headless Chromium with a **180 s** per-page budget, enough
    /// for a full infinite-scroll session.
    pub async fn new() -> Result<Self, AppError> {
        Self::with_options(Duration::from_secs(180), None).await
    }

    /// Launches headless Chromium with a custom per-page timeout and an
    /// optional proxy server.
    pub async fn with_options(timeout: Duration, proxy_url: Option<&str>) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium rejects the standard headless flags, so
        // prefer a real binary when one is installed.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        builder = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", crate::headers::random_user_agent()));

        if let Some(proxy_url) = proxy_url {
            builder = builder.arg(format!("--proxy-server={proxy_url}"));
        }

        let config = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    async fn render(&self, request: &FetchRequest) -> Result<String, AppError> {
        let url = request.url.as_str();
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;
        let tab = TabGuard::new(page.clone());

        let result = async {
            page.find_element("body")
                .await
                .map_err(|e| AppError::BrowserError(format!("Page did not render body: {e}")))?;

            if let Some(plan) = &request.scroll {
                scroll_page(&page, plan).await?;
            }

            page.content()
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
        }
        .await;

        tab.close().await;
        result
    }
}

/// An open browser tab.
trait Tab: Send + 'static {
    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

impl Tab for Page {
    async fn close(self) -> Result<(), AppError> {
        Page::close(self)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to close tab: {e}")))
    }
}

fn log_close_failure(result: Result<(), AppError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "Browser tab left open");
    }
}

/// Closes its tab exactly once: explicitly through [`TabGuard::close`], or
/// on a background task when the owning render future is dropped by a
/// timeout or cancellation.
struct TabGuard<T: Tab> {
    tab: Option<T>,
}

impl<T: Tab> TabGuard<T> {
    fn new(tab: T) -> Self {
        Self { tab: Some(tab) }
    }

    async fn close(mut self) {
        if let Some(tab) = self.tab.take() {
            log_close_failure(tab.close().await);
        }
    }
}

impl<T: Tab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        let Some(tab) = self.tab.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { log_close_failure(tab.close().await) });
            }
            Err(_) => tracing::warn!("No runtime to close abandoned browser tab"),
        }
    }
}

async fn scroll_page(page: &Page, plan: &ScrollPlan) -> Result<(), AppError> {
    let selector = plan.item_selector.as_str();
    let appeared = tokio::time::timeout(plan.selector_timeout, async {
        while page.find_element(selector).await.is_err() {
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    })
    .await;
    if appeared.is_err() {
        tracing::warn!(%selector, "No items found, page might have a different structure");
    }

    let mut driver = PageScrollDriver { page };
    let outcome = run_scroll(&mut driver, plan).await?;
    tracing::info!(
        loaded_items = outcome.loaded_items,
        attempts = outcome.attempts,
        "Finished scrolling"
    );
    Ok(())
}

/// [`ScrollDriver`] over a live Chromium tab.
struct PageScrollDriver<'a> {
    page: &'a Page,
}

impl ScrollDriver for PageScrollDriver<'_> {
    async fn scroll_to_bottom(&mut self) -> Result<(), AppError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
            .map_err(|e| AppError::BrowserError(format!("Scroll failed: {e}")))
    }

    async fn count_items(&mut self, selector: &str) -> Result<usize, AppError> {
        // A selector with no matches is a zero count, not a failure.
        Ok(self
            .page
            .find_elements(selector)
            .await
            .map(|elements| elements.len())
            .unwrap_or(0))
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, AppError> {
        match tokio::time::timeout(self.timeout, self.render(request)).await {
            Ok(inner) => inner,
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingTab {
        closed: Arc<AtomicUsize>,
    }

    impl Tab for RecordingTab {
        async fn close(self) -> Result<(), AppError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn finished_render_closes_its_tab_once() {
        let tab = RecordingTab::default();
        TabGuard::new(tab.clone()).close().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tab.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abandoned_render_still_closes_its_tab() {
        let tab = RecordingTab::default();
        let guard = TabGuard::new(tab.clone());
        let render = async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        };

        assert!(
            tokio::time::timeout(Duration::from_millis(10), render)
                .await
                .is_err()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tab.closed.load(Ordering::SeqCst), 1);
    }
}
