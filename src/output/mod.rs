//! Output module for converted documents
//!
//! This module handles:
//! - Writing documents as Markdown files with optional JSON metadata
//! - Deriving stable file paths from page URLs
//! - Reporting run and cache statistics

mod markdown;
mod memory;
pub mod stats;
mod traits;

pub use markdown::{document_path, metadata_path, MarkdownWriter};
pub use memory::MemoryWriter;
pub use stats::{format_cache_stats, format_summary, print_cache_stats, print_summary};
pub use traits::{OutputError, OutputResult, Writer};
