//! CLI entry point for the subway delay monitor.
//!
//! `serve` polls the status feed forever and answers delay queries over HTTP;
//! `check` fetches the feed once and prints the lines currently delayed.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use subway_status::api::router;
use subway_status::config::load_catalog;
use subway_status::fetch::auth::ApiKey;
use subway_status::fetch::{BasicClient, HttpClient};
use subway_status::infra::siri::SiriFeedClient;
use subway_status::lines::LineCatalog;
use subway_status::output::{CheckReport, print_report};
use subway_status::parser::FeedFormat;
use subway_status::query::QueryService;
use subway_status::scheduler::Scheduler;
use subway_status::services::DelayFeed;
use subway_status::tracker::TrackerState;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FEED_URL: &str = "http://web.mta.info/status/ServiceStatusSubway.xml";

#[derive(Parser)]
#[command(name = "subway_status")]
#[command(about = "Monitor subway line delays and report per-line uptime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the status feed and serve delay queries over HTTP
    Serve {
        #[command(flatten)]
        feed: FeedArgs,

        /// Address the query API listens on
        #[arg(long, env = "SUBWAY_STATUS_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Polling interval in seconds
        #[arg(
            short = 'r',
            long,
            env = "SUBWAY_STATUS_INTERVAL",
            default_value_t = 30,
            value_parser = clap::value_parser!(u64).range(1..=86400)
        )]
        interval: u64,
    },
    /// Fetch the status feed once and print the delayed lines
    Check {
        /// Path to file or URL to fetch (defaults to --feed-url)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,

        #[command(flatten)]
        feed: FeedArgs,

        /// Print the result as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct FeedArgs {
    /// URL of the SIRI service status document
    #[arg(long, env = "SUBWAY_STATUS_FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// JSON file listing recognized lines and aliases
    #[arg(long, env = "SUBWAY_STATUS_LINES")]
    lines_config: Option<PathBuf>,

    /// Prefix stripped from every LineRef
    #[arg(long, default_value = "MTA NYCT_")]
    vendor_prefix: String,

    /// Summary value that marks a situation as a delay
    #[arg(long, default_value = "Delays")]
    delay_indicator: String,

    /// Upper bound on a single feed fetch, in seconds
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..=86400))]
    fetch_timeout: u64,

    /// API key sent with every feed request
    #[arg(long, env = "SUBWAY_STATUS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Header carrying the API key
    #[arg(long, default_value = "x-api-key")]
    api_key_header: String,
}

impl FeedArgs {
    fn format(&self) -> FeedFormat {
        FeedFormat {
            vendor_prefix: self.vendor_prefix.clone(),
            delay_indicator: self.delay_indicator.clone(),
        }
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    fn http_client(&self) -> Result<Arc<dyn HttpClient>> {
        let basic = BasicClient::new(self.fetch_timeout())?;
        let client: Arc<dyn HttpClient> = match &self.api_key {
            Some(key) => Arc::new(ApiKey::new(basic, &self.api_key_header, key)?),
            None => Arc::new(basic),
        };
        Ok(client)
    }

    fn feed_client(&self, source: &str, catalog: Arc<LineCatalog>) -> Result<SiriFeedClient> {
        Ok(SiriFeedClient::new(self.http_client()?, source, self.format(), catalog))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/subway_status.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_status.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            feed,
            bind,
            interval,
        } => serve(&feed, bind, interval).await?,
        Commands::Check { source, feed, json } => {
            let source = source.unwrap_or_else(|| feed.feed_url.clone());
            check(&feed, &source, json).await?;
        }
    }

    Ok(())
}

/// Runs the first monitoring cycle, then serves queries while the scheduler
/// keeps polling in the background.
#[tracing::instrument(skip(feed), fields(feed_url = %feed.feed_url))]
async fn serve(feed: &FeedArgs, bind: SocketAddr, interval: u64) -> Result<()> {
    let catalog = Arc::new(load_catalog(feed.lines_config.as_deref())?);
    info!(lines = catalog.len(), "Line catalog loaded");

    let tracker = TrackerState::shared(&catalog);
    let client = feed.feed_client(&feed.feed_url, catalog.clone())?;
    let scheduler = Arc::new(Scheduler::new(
        client,
        tracker.clone(),
        Duration::from_secs(interval),
        feed.fetch_timeout(),
    ));
    let monitor = scheduler.start().await;

    let app = router(QueryService::new(tracker, catalog));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "Query API listening");

    let result = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    monitor.abort();
    match result {
        Ok(()) => {
            info!("API server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "API server error");
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Fetches and parses the feed once.
#[tracing::instrument(skip(feed, json))]
async fn check(feed: &FeedArgs, source: &str, json: bool) -> Result<()> {
    let catalog = Arc::new(load_catalog(feed.lines_config.as_deref())?);
    let client = feed.feed_client(source, catalog)?;

    let delayed = tokio::time::timeout(feed.fetch_timeout(), client.fetch_delayed_lines())
        .await
        .map_err(|_| anyhow::anyhow!("fetch timed out after {}s", feed.fetch_timeout))??;

    let report = CheckReport {
        checked_at: Utc::now(),
        source,
        delayed: &delayed,
    };
    print_report(&report, json)
}
