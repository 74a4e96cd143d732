//! Crawl engine for documentation sites
//!
//! This module contains the core crawling logic, including:
//! - The frontier of discovered URLs with atomic deduplication
//! - A fixed-width worker pool driven by a cancellation token
//! - Depth, scope, exclusion and limit policies
//! - Content classification into HTML, Markdown or other

mod classify;
mod engine;
mod frontier;

pub use classify::{classify_content, ContentKind};
pub use engine::{CrawlEngine, CrawlOptions, CrawlSummary, Termination};
pub use frontier::FrontierEntry;
