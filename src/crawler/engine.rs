//! Concurrent crawl engine
//!
//! A run moves through these states:
//! - seeded: the seed is queued at depth 0 and processed before anything else
//! - draining: a fixed pool of workers pops, fetches, converts, writes and enqueues
//! - exhausted / limit reached: normal completion, reported in [`CrawlSummary`]
//! - cancelled / failed: returned as [`HarvestError`]

use crate::convert::{Converter, Document};
use crate::crawler::classify::{classify_content, ContentKind};
use crate::crawler::frontier::{Frontier, FrontierEntry, InFlight, Pop};
use crate::fetch::Fetcher;
use crate::output::Writer;
use crate::url::{normalize_url, ExclusionSet, LinkScope};
use crate::HarvestError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Options for a single crawl run
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum link depth from the seed (0 = seed only)
    pub max_depth: u32,
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Stop after this many documents
    pub limit: Option<usize>,
    /// Regex patterns; matching links are never enqueued
    pub exclude_patterns: Vec<String>,
    /// CSS selector preferred over heuristic content extraction
    pub content_selector: Option<String>,
    /// Restrict traversal to links starting with this URL
    pub filter_url: Option<String>,
    /// Run the pipeline without handing documents to the writer
    pub dry_run: bool,
    /// Rewrite documents whose output already exists
    pub force: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 0,
            concurrency: 5,
            limit: None,
            exclude_patterns: Vec::new(),
            content_selector: None,
            filter_url: None,
            dry_run: false,
            force: false,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Termination {
    /// Frontier empty with nothing in flight
    #[default]
    Exhausted,
    /// The document limit was hit; remaining entries were abandoned
    LimitReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "exhausted"),
            Self::LimitReached => write!(f, "limit reached"),
        }
    }
}

/// Counters for a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub termination: Termination,
    /// Pages fetched successfully, cache hits included
    pub pages_fetched: usize,
    /// Documents handed to the writer (or produced under dry-run)
    pub documents_written: usize,
    /// Pages dropped without error: non-document content, existing output,
    /// depth overflow, limit overflow
    pub pages_skipped: usize,
    /// Pages whose fetch, conversion or write failed
    pub pages_failed: usize,
    /// Pages served from the response cache
    pub cache_hits: usize,
    pub duration: Duration,
}

impl CrawlSummary {
    /// Folds another run into this one, as done for multi-batch strategies
    pub fn merge(&mut self, other: &CrawlSummary) {
        if other.termination == Termination::LimitReached {
            self.termination = Termination::LimitReached;
        }
        self.pages_fetched += other.pages_fetched;
        self.documents_written += other.documents_written;
        self.pages_skipped += other.pages_skipped;
        self.pages_failed += other.pages_failed;
        self.cache_hits += other.cache_hits;
        self.duration += other.duration;
    }
}

#[derive(Debug, Default)]
struct RunStats {
    fetched: AtomicUsize,
    written: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl RunStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self, termination: Termination, duration: Duration) -> CrawlSummary {
        CrawlSummary {
            termination,
            pages_fetched: self.fetched.load(Ordering::Relaxed),
            documents_written: self.written.load(Ordering::Relaxed),
            pages_skipped: self.skipped.load(Ordering::Relaxed),
            pages_failed: self.failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            duration,
        }
    }
}

/// State shared by every worker of one run
struct RunContext {
    fetcher: Arc<dyn Fetcher>,
    writer: Arc<dyn Writer>,
    converter: Converter,
    source_name: String,
    frontier: Frontier,
    scopes: Vec<LinkScope>,
    exclusions: ExclusionSet,
    options: CrawlOptions,
    stats: RunStats,
}

/// Drives fetch, convert and write cycles over a frontier of URLs
///
/// # Example
///
/// ```no_run
/// use doc_harvest::config::FetchConfig;
/// use doc_harvest::output::MemoryWriter;
/// use doc_harvest::{CrawlEngine, CrawlOptions, Converter, HttpFetcher};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Arc::new(HttpFetcher::new(&FetchConfig::default())?);
/// let writer = Arc::new(MemoryWriter::new());
/// let engine = CrawlEngine::new(fetcher, Converter::default(), writer);
///
/// let options = CrawlOptions { max_depth: 1, ..CrawlOptions::default() };
/// let summary = engine
///     .run(&CancellationToken::new(), "https://example.com/docs/", &options)
///     .await?;
/// println!("{} documents", summary.documents_written);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    converter: Converter,
    writer: Arc<dyn Writer>,
    source_name: String,
}

impl CrawlEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, converter: Converter, writer: Arc<dyn Writer>) -> Self {
        Self {
            fetcher,
            converter,
            writer,
            source_name: "crawler".to_string(),
        }
    }

    /// Sets the strategy name recorded on every produced document
    pub fn with_source_name(mut self, name: &str) -> Self {
        self.source_name = name.to_string();
        self
    }

    /// Crawls outward from a single seed
    ///
    /// The seed is processed before any worker starts; if it fails the run
    /// fails with [`HarvestError::SeedFailed`]. Later page failures are
    /// logged and counted, never fatal.
    ///
    /// # Arguments
    ///
    /// * `cancel` - Token that aborts the run with [`HarvestError::Cancelled`]
    /// * `seed` - Absolute http(s) URL to start from
    /// * `options` - Depth, concurrency, limit and filtering options
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        seed: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, HarvestError> {
        let started = Instant::now();
        let seed_url = normalize_url(seed)?;
        let ctx = Arc::new(self.context(options, std::slice::from_ref(&seed_url))?);

        tracing::info!(
            "Starting crawl of {} (max depth {}, concurrency {})",
            seed_url,
            options.max_depth,
            options.concurrency
        );

        ctx.frontier.push(seed_url.clone(), 0);
        if let Pop::Entry(entry) = ctx.frontier.pop() {
            let _in_flight = InFlight(&ctx.frontier);
            if cancel.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }
            if let Err(e) = process_entry(&ctx, cancel, &entry).await {
                if e.is_cancelled() {
                    return Err(HarvestError::Cancelled);
                }
                tracing::error!("Seed {} failed: {}", seed_url, e);
                return Err(HarvestError::SeedFailed {
                    url: seed_url.to_string(),
                    source: Box::new(e),
                });
            }
        }

        let termination = drain(ctx.clone(), cancel).await?;
        let summary = ctx.stats.summary(termination, started.elapsed());
        log_completion(&seed_url, &summary);
        Ok(summary)
    }

    /// Processes several seeds at depth 0, none of them fatal
    ///
    /// Used by strategies that already know the page list, such as sitemaps
    /// and link lists. Invalid or duplicate URLs are skipped.
    pub async fn run_batch(
        &self,
        cancel: &CancellationToken,
        urls: &[String],
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, HarvestError> {
        let started = Instant::now();
        let seeds: Vec<Url> = urls
            .iter()
            .filter_map(|u| match normalize_url(u) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Skipping invalid URL {}: {}", u, e);
                    None
                }
            })
            .collect();

        let ctx = Arc::new(self.context(options, &seeds)?);
        let queued = seeds
            .into_iter()
            .filter(|url| ctx.frontier.push(url.clone(), 0))
            .count();

        tracing::info!(
            "Starting batch of {} URLs (concurrency {})",
            queued,
            options.concurrency
        );

        let termination = drain(ctx.clone(), cancel).await?;
        let summary = ctx.stats.summary(termination, started.elapsed());
        tracing::info!(
            "Batch complete: {} documents from {} pages ({} failed, {} skipped) in {:?}",
            summary.documents_written,
            summary.pages_fetched,
            summary.pages_failed,
            summary.pages_skipped,
            summary.duration
        );
        Ok(summary)
    }

    fn context(&self, options: &CrawlOptions, seeds: &[Url]) -> Result<RunContext, HarvestError> {
        let converter = match options.content_selector.as_deref() {
            Some(selector) => self
                .converter
                .clone()
                .with_content_selector(Some(selector))
                .map_err(|source| HarvestError::Convert {
                    url: seeds.first().map(Url::to_string).unwrap_or_default(),
                    source,
                })?,
            None => self.converter.clone(),
        };

        let scopes = seeds
            .iter()
            .map(|seed| LinkScope::new(seed, options.filter_url.as_deref()))
            .collect();

        Ok(RunContext {
            fetcher: self.fetcher.clone(),
            writer: self.writer.clone(),
            converter,
            source_name: self.source_name.clone(),
            frontier: Frontier::new(options.limit),
            scopes,
            exclusions: ExclusionSet::new(&options.exclude_patterns),
            options: options.clone(),
            stats: RunStats::default(),
        })
    }
}

fn log_completion(seed: &Url, summary: &CrawlSummary) {
    tracing::info!(
        "Crawl of {} {}: {} documents from {} pages ({} failed, {} skipped) in {:?}",
        seed,
        summary.termination,
        summary.documents_written,
        summary.pages_fetched,
        summary.pages_failed,
        summary.pages_skipped,
        summary.duration
    );
}

/// Runs the worker pool until the frontier is exhausted or the limit is hit
async fn drain(ctx: Arc<RunContext>, cancel: &CancellationToken) -> Result<Termination, HarvestError> {
    let workers = ctx.options.concurrency.max(1);
    let mut tasks = JoinSet::new();
    for id in 0..workers {
        tasks.spawn(worker(id, ctx.clone(), cancel.clone()));
    }

    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| HarvestError::Worker(e.to_string())).and_then(|r| r);
        if let Err(e) = result {
            if failure.is_none() {
                failure = Some(e);
            }
            // One failed worker stops the run
            tasks.abort_all();
        }
    }

    if cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(if ctx.frontier.limit_reached() {
        Termination::LimitReached
    } else {
        Termination::Exhausted
    })
}

/// Pops and processes entries until the frontier reports completion
async fn worker(
    id: usize,
    ctx: Arc<RunContext>,
    cancel: CancellationToken,
) -> Result<(), HarvestError> {
    tracing::trace!("Worker {} started", id);

    loop {
        if cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        let changed = ctx.frontier.changed();
        match ctx.frontier.pop() {
            Pop::Entry(entry) => {
                let _in_flight = InFlight(&ctx.frontier);
                if let Err(e) = process_entry(&ctx, &cancel, &entry).await {
                    if e.is_cancelled() {
                        return Err(HarvestError::Cancelled);
                    }
                    tracing::warn!("Dropping {}: {}", entry.url, e);
                    RunStats::bump(&ctx.stats.failed);
                }
            }
            Pop::Wait => {
                tokio::select! {
                    _ = changed => {}
                    _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
                }
            }
            Pop::Done => {
                tracing::trace!("Worker {} finished", id);
                return Ok(());
            }
        }
    }
}

/// Fetch, classify, convert, deliver and expand one entry
async fn process_entry(
    ctx: &RunContext,
    cancel: &CancellationToken,
    entry: &FrontierEntry,
) -> Result<(), HarvestError> {
    let options = &ctx.options;
    if entry.depth > options.max_depth {
        tracing::trace!("Skipping {} at depth {}", entry.url, entry.depth);
        RunStats::bump(&ctx.stats.skipped);
        return Ok(());
    }

    tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
    let response = ctx.fetcher.get(cancel, entry.url.as_str()).await?;
    RunStats::bump(&ctx.stats.fetched);
    if response.from_cache {
        RunStats::bump(&ctx.stats.cache_hits);
    }

    let page_url = match normalize_url(&response.final_url) {
        Ok(final_url) => {
            if final_url != entry.url {
                tracing::debug!("{} redirected to {}", entry.url, final_url);
                ctx.frontier.mark_visited(&final_url);
            }
            final_url
        }
        Err(_) => entry.url.clone(),
    };

    let kind = classify_content(&page_url, &response.content_type);
    if kind == ContentKind::Other {
        tracing::debug!(
            "Discarding {} with content type {:?}",
            page_url,
            response.content_type
        );
        RunStats::bump(&ctx.stats.skipped);
        return Ok(());
    }

    // Conversion is CPU bound and must not stall the runtime workers
    let converter = ctx.converter.clone();
    let url = page_url.clone();
    let body = response.body;
    let content_type = response.content_type;
    let converted = tokio::task::spawn_blocking(move || match kind {
        ContentKind::Markdown => converter.convert_markdown(&body, &url, &content_type),
        _ => converter.convert(&body, &url, &content_type),
    })
    .await
    .map_err(|e| HarvestError::Worker(e.to_string()))?;

    let doc = converted
        .map_err(|source| HarvestError::Convert {
            url: page_url.to_string(),
            source,
        })?
        .with_source(&ctx.source_name, response.from_cache);

    deliver(ctx, &doc)?;
    enqueue_links(ctx, &doc.links, entry.depth);
    Ok(())
}

/// Hands a document to the writer, honouring dry-run, force and the limit
fn deliver(ctx: &RunContext, doc: &Document) -> Result<(), HarvestError> {
    let options = &ctx.options;

    if !options.force && !options.dry_run && ctx.writer.exists(&doc.url) {
        tracing::debug!("Output for {} exists, skipping", doc.url);
        RunStats::bump(&ctx.stats.skipped);
        return Ok(());
    }

    if !ctx.frontier.claim_result() {
        tracing::trace!("Limit reached, dropping {}", doc.url);
        RunStats::bump(&ctx.stats.skipped);
        return Ok(());
    }

    if options.dry_run {
        tracing::info!("[dry-run] {} ({} words)", doc.url, doc.word_count);
    } else {
        ctx.writer.write(doc)?;
        tracing::debug!("Wrote {}", doc.url);
    }

    RunStats::bump(&ctx.stats.written);
    Ok(())
}

/// Filters discovered links and queues the survivors one level deeper
fn enqueue_links(ctx: &RunContext, links: &[String], depth: u32) {
    let next_depth = depth + 1;
    if next_depth > ctx.options.max_depth || ctx.frontier.limit_reached() {
        return;
    }

    let mut queued = 0;
    for link in links {
        let url = match normalize_url(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", link, e);
                continue;
            }
        };

        if !ctx.scopes.iter().any(|scope| scope.allows(&url)) {
            tracing::trace!("Out of scope: {}", url);
            continue;
        }

        if ctx.exclusions.is_excluded(url.as_str()) {
            tracing::trace!("Excluded: {}", url);
            continue;
        }

        if ctx.frontier.push(url, next_depth) {
            queued += 1;
        }
    }

    if queued > 0 {
        tracing::trace!("Queued {} links at depth {}", queued, next_depth);
    }
}
