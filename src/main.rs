//! doc-harvest main entry point
//!
//! This is the command-line interface for the doc-harvest documentation harvester.

use anyhow::{bail, Context};
use clap::Parser;
use doc_harvest::cache::{Cache, SqliteCache};
use doc_harvest::config::{load_config_with_hash, validate, Config};
use doc_harvest::output::{print_cache_stats, print_summary, MarkdownWriter};
use doc_harvest::{
    create_strategy, detect_strategy, validate_url, Converter, Fetcher, HttpFetcher,
    StrategyDeps, StrategyType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// doc-harvest: documentation harvester
///
/// doc-harvest fetches documentation from websites, sitemaps, llms.txt link
/// lists, wikis, package registries and source repositories, and writes
/// every page as a Markdown file with JSON metadata.
#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(version)]
#[command(about = "Harvest documentation into Markdown", long_about = None)]
struct Cli {
    /// Source URL: website, sitemap, llms.txt, wiki, registry page or repository
    #[arg(value_name = "URL", required_unless_present_any = ["cache_stats", "clear_cache"])]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory for Markdown files
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Maximum link depth from the seed (0 = seed only)
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Number of concurrent workers
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Stop after this many documents
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Regex for URLs to skip (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    exclude: Vec<String>,

    /// CSS selector for the content region
    #[arg(long)]
    selector: Option<String>,

    /// Only follow links starting with this URL
    #[arg(long, value_name = "URL")]
    filter_url: Option<String>,

    /// Run the whole pipeline without writing files
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing output
    #[arg(long)]
    force: bool,

    /// Bypass the response cache
    #[arg(long)]
    no_cache: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the strategy chosen for URL and exit
    #[arg(long, conflicts_with_all = ["cache_stats", "clear_cache"])]
    detect: bool,

    /// Show response cache statistics and exit
    #[arg(long, conflicts_with_all = ["detect", "clear_cache"])]
    cache_stats: bool,

    /// Delete every cached response and exit
    #[arg(long, conflicts_with_all = ["detect", "cache_stats"])]
    clear_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid options")?;

    if cli.cache_stats {
        return handle_cache_stats(&config);
    }
    if cli.clear_cache {
        return handle_clear_cache(&config);
    }

    let url = cli.url.as_deref().unwrap_or_default().trim().to_string();
    validate_url(&url).with_context(|| format!("Invalid URL {:?}", url))?;

    if cli.detect {
        println!("{}", detect_strategy(&url));
        return Ok(());
    }

    handle_harvest(config, &url, cli.no_cache, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvest=info,warn"),
            1 => EnvFilter::new("doc_harvest=debug,info"),
            2 => EnvFilter::new("doc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Command-line flags take precedence over file values
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawl.max_depth = max_depth;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawl.concurrency = concurrency;
    }
    if let Some(limit) = cli.limit {
        config.crawl.limit = Some(limit);
    }
    if !cli.exclude.is_empty() {
        config.crawl.exclude_patterns.extend(cli.exclude.iter().cloned());
    }
    if let Some(selector) = &cli.selector {
        config.crawl.content_selector = Some(selector.clone());
    }
    if let Some(filter_url) = &cli.filter_url {
        config.crawl.filter_url = Some(filter_url.clone());
    }
    config.crawl.dry_run |= cli.dry_run;
    config.crawl.force |= cli.force;
    if cli.no_cache {
        config.cache.enabled = false;
    }
}

fn open_cache(config: &Config) -> anyhow::Result<SqliteCache> {
    SqliteCache::open(Path::new(&config.cache.path))
        .with_context(|| format!("Failed to open cache at {}", config.cache.path))
}

/// Handles the --cache-stats mode
fn handle_cache_stats(config: &Config) -> anyhow::Result<()> {
    println!("Cache: {}\n", config.cache.path);
    let cache = open_cache(config)?;
    print_cache_stats(&cache.stats()?);
    cache.close()?;
    Ok(())
}

/// Handles the --clear-cache mode
fn handle_clear_cache(config: &Config) -> anyhow::Result<()> {
    let cache = open_cache(config)?;
    let entries = cache.stats()?.entries;
    cache.clear()?;
    cache.close()?;
    println!("✓ Removed {} cached responses from {}", entries, config.cache.path);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    url: &str,
    no_cache: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let kind = detect_strategy(url);
    if kind == StrategyType::Unknown {
        bail!("No strategy can handle {}", url);
    }
    tracing::info!("Using {} strategy for {}", kind, url);

    let mut fetcher = HttpFetcher::new(&config.fetch)
        .context("Failed to build HTTP client")?
        .with_retry_policy(config.retry_policy());
    if config.cache.enabled && !no_cache {
        let cache: Arc<dyn Cache> = Arc::new(open_cache(&config)?);
        fetcher = fetcher.with_cache(cache, config.cache_ttl());
    }
    let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);

    let converter =
        Converter::new(config.markdown_options()).keep_raw_html(config.output.keep_raw_html);
    let writer = Arc::new(MarkdownWriter::new(
        &config.output.directory,
        config.output.write_metadata,
    ));

    let strategy = create_strategy(kind, StrategyDeps::new(fetcher.clone(), converter, writer))?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling harvest");
                cancel.cancel();
            }
        }
    });

    let result = strategy
        .execute(&cancel, url, &config.crawl_options())
        .await;

    if let Err(e) = fetcher.close().await {
        tracing::warn!("Failed to close fetcher: {}", e);
    }

    let summary = result.with_context(|| format!("Harvest of {} failed", url))?;
    if !quiet {
        println!();
        print_summary(&summary);
        if !config.crawl.dry_run {
            println!("\nOutput: {}", config.output.directory);
        }
    }

    Ok(())
}
