mod sink;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use toolscout_client::{ReqwestFetcher, default_registry};
use toolscout_core::config::{CrawlConfig, CrawlInput, ProxyInput};
use toolscout_core::extract::ExtractorRegistry;
use toolscout_core::models::CrawlSummary;
use toolscout_core::reporter::TracingCrawlReporter;
use toolscout_core::route::classify_url;
use toolscout_core::traits::Fetcher;
use toolscout_core::CrawlController;

use crate::sink::{OutputFormat, OutputSink};

#[derive(Parser)]
#[command(name = "toolscout", version, about = "Crawler for AI-tool directory sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl directory sites and write normalized tool records
    Crawl(CrawlArgs),

    /// Print the route label each URL would be handled with
    Classify {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Args)]
struct CrawlArgs {
    /// JSON input document (startUrls, maxItems, proxyConfiguration)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Start URL (repeatable); overrides the input file
    #[arg(short = 'u', long = "start-url")]
    start_urls: Vec<String>,

    /// Maximum number of records to collect
    #[arg(short, long, env = "TOOLSCOUT_MAX_ITEMS")]
    max_items: Option<usize>,

    /// Concurrent requests (defaults to 5, or 2 with --browser)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Timeout in seconds per fetch attempt
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Timeout in seconds per rendered (scrolled) fetch attempt
    #[arg(long, default_value_t = 180)]
    rendered_timeout_secs: u64,

    /// Proxy URL (repeatable); the first one is used
    #[arg(long = "proxy-url", env = "TOOLSCOUT_PROXY_URL", value_delimiter = ',')]
    proxy_urls: Vec<String>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Render infinite-scroll pages in headless Chromium (requires the `browser` feature)
    #[arg(long, default_value_t = false)]
    browser: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("toolscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => cmd_crawl(args).await?,
        Commands::Classify { urls } => cmd_classify(&urls),
    }

    Ok(())
}

fn cmd_classify(urls: &[String]) {
    for url in urls {
        println!("{}\t{}", classify_url(url), url);
    }
}

/// Merge the input document with command-line overrides.
fn resolve_input(args: &CrawlArgs) -> Result<CrawlInput> {
    let mut input = match &args.input {
        Some(path) => CrawlInput::from_file(path)
            .with_context(|| format!("Failed to load input file: {}", path.display()))?,
        None => CrawlInput::default(),
    };

    if !args.start_urls.is_empty() {
        input.start_urls = args.start_urls.clone();
    }
    if let Some(max_items) = args.max_items {
        input.max_items = Some(max_items);
    }
    if !args.proxy_urls.is_empty() {
        input.proxy_configuration = Some(ProxyInput {
            proxy_urls: args.proxy_urls.clone(),
        });
    }

    input.validate()?;
    Ok(input)
}

/// Everything a crawl needs apart from the fetcher.
struct CrawlJob {
    sink: OutputSink,
    extractors: ExtractorRegistry,
    config: CrawlConfig,
    seeds: Vec<String>,
    max_items: usize,
    shutdown: CancellationToken,
}

impl CrawlJob {
    async fn run<F: Fetcher>(self, fetcher: F) -> Result<CrawlSummary> {
        let controller =
            CrawlController::new(fetcher, self.sink.clone(), self.extractors, self.config);
        let summary = controller
            .start_with_shutdown(
                &self.seeds,
                self.max_items,
                &self.shutdown,
                &TracingCrawlReporter,
            )
            .await;
        self.sink.flush().context("Failed to flush output")?;
        Ok(summary)
    }
}

async fn cmd_crawl(args: CrawlArgs) -> Result<()> {
    let input = resolve_input(&args)?;
    let seeds = input.resolved_start_urls();
    let max_items = input.resolved_max_items();
    let proxy = input.proxy_urls().first().map(String::as_str);

    let concurrency = args
        .concurrency
        .unwrap_or(if args.browser { 2 } else { 5 });
    let config = CrawlConfig::default()
        .with_concurrency(concurrency)
        .with_request_timeout(Duration::from_secs(args.timeout_secs))
        .with_rendered_timeout(Duration::from_secs(args.rendered_timeout_secs));

    tracing::info!(
        max_items,
        start_urls = seeds.len(),
        concurrency = config.concurrency,
        "Configuration loaded"
    );

    let sink = OutputSink::open(args.output.as_deref(), args.format)
        .context("Failed to open output")?;
    let extractors = default_registry().context("Failed to build site extractors")?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            signal.cancel();
        }
    });

    let job = CrawlJob {
        sink,
        extractors,
        config,
        seeds,
        max_items,
        shutdown,
    };

    let http = ReqwestFetcher::with_options(Duration::from_secs(30), proxy)
        .context("Failed to create HTTP client")?;
    let summary = if args.browser {
        crawl_rendered(job, http, proxy).await?
    } else {
        job.run(http).await?
    };

    print_summary(&summary, args.output.as_deref())
}

#[cfg(feature = "browser")]
async fn crawl_rendered(
    job: CrawlJob,
    http: ReqwestFetcher,
    proxy: Option<&str>,
) -> Result<CrawlSummary> {
    use toolscout_client::{BrowserFetcher, RoutingFetcher};

    let rendered = BrowserFetcher::with_options(job.config.rendered_timeout, proxy)
        .await
        .context("Failed to launch headless browser")?;
    job.run(RoutingFetcher::new(http, rendered)).await
}

#[cfg(not(feature = "browser"))]
async fn crawl_rendered(
    _job: CrawlJob,
    _http: ReqwestFetcher,
    _proxy: Option<&str>,
) -> Result<CrawlSummary> {
    anyhow::bail!("--browser requires toolscout to be built with the `browser` feature")
}

/// The summary goes to stdout unless stdout already carries the records.
fn print_summary(summary: &CrawlSummary, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(summary)?;
    if output.is_some() {
        println!("{rendered}");
    } else {
        eprintln!("{rendered}");
    }
    Ok(())
}
