mod api_types;
mod fetch;
mod filter;
mod models;
mod orchestrator;
mod paging;
mod post;
mod render;
mod resolve;
mod rotator;
mod tags;
mod xref;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

use crate::filter::Timeframe;
use crate::orchestrator::ViewConfig;
use crate::paging::DEFAULT_PAGE_SIZE;

/// Trigger Risk Monitor - renders the research log's briefing views from
/// the published JSON registries.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the page being rendered for (preferred resolution base)
    #[arg(long)]
    base: Option<String>,

    /// Output directory for rendered fragments (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: String,

    /// Cards per page in the archive grid
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Restrict the archive to one cluster
    #[arg(long, default_value = "")]
    cluster: String,

    /// Timeframe in days, or "all"
    #[arg(long, default_value = "all")]
    timeframe: String,

    /// Free-text search query
    #[arg(long, default_value = "")]
    query: String,

    /// Render the tag archive for this tag slug
    #[arg(long)]
    tag: Option<String>,

    /// Render post-page enhancements for this page path
    #[arg(long)]
    post: Option<String>,

    /// Treat sentinel visibility observation as unavailable (manual
    /// pagination only)
    #[arg(long)]
    no_sentinel: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting trigger-monitor");

    let args = Args::parse();

    // Data root - the analogue of the executing script's own URL when the
    // page base is missing or unusable.
    let data_base = std::env::var("TRM_DATA_BASE").ok();
    debug!(
        "Resolution bases - page={:?}, data={:?}",
        args.base, data_base
    );

    let config = ViewConfig {
        page_base: args.base,
        data_base,
        output_dir: args.output_dir.into(),
        page_size: args.page_size,
        cluster: args.cluster,
        timeframe: Timeframe::parse(&args.timeframe),
        query: args.query,
        tag: args.tag,
        post_path: args.post,
        sentinel_available: !args.no_sentinel,
    };

    let today = Utc::now().date_naive();
    info!(
        "Rendering views - today={}, output_dir={}",
        today,
        config.output_dir.display()
    );

    orchestrator::run(&config, today).await
}
