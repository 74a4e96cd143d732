//! Run and cache statistics reporting
//!
//! Formats the [`CrawlSummary`] returned by a run and the [`CacheStats`]
//! of the response cache for display on stdout.

use crate::cache::CacheStats;
use crate::crawler::CrawlSummary;

/// Formats a crawl summary as plain text
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Summary ===\n\n");
    out.push_str(&format!("Termination: {}\n", summary.termination));
    out.push_str(&format!(
        "Duration: {:.2}s\n\n",
        summary.duration.as_secs_f64()
    ));

    out.push_str("Pages:\n");
    out.push_str(&format!("  Fetched: {}\n", summary.pages_fetched));
    out.push_str(&format!("  From cache: {}\n", summary.cache_hits));
    out.push_str(&format!("  Documents written: {}\n", summary.documents_written));
    out.push_str(&format!("  Skipped: {}\n", summary.pages_skipped));
    out.push_str(&format!("  Failed: {}\n", summary.pages_failed));

    let attempted = summary.pages_fetched + summary.pages_failed;
    let success_rate = if attempted > 0 {
        (summary.pages_fetched as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "\nSuccess Rate: {:.1}% ({} / {} pages fetched)\n",
        success_rate, summary.pages_fetched, attempted
    ));

    out
}

/// Prints a crawl summary to stdout
///
/// # Arguments
///
/// * `summary` - The summary returned by a run
pub fn print_summary(summary: &CrawlSummary) {
    print!("{}", format_summary(summary));
}

/// Formats cache statistics as plain text
pub fn format_cache_stats(stats: &CacheStats) -> String {
    let mut out = String::new();

    out.push_str("=== Cache Statistics ===\n\n");
    out.push_str(&format!("  Entries: {}\n", stats.entries));
    out.push_str(&format!("  Expired: {}\n", stats.expired));
    out.push_str(&format!(
        "  Stored bytes: {} ({:.2} MiB)\n",
        stats.total_bytes,
        stats.total_bytes as f64 / (1024.0 * 1024.0)
    ));
    out.push_str(&format!("  Hits: {}\n", stats.hits));
    out.push_str(&format!("  Misses: {}\n", stats.misses));

    out
}

/// Prints cache statistics to stdout
pub fn print_cache_stats(stats: &CacheStats) {
    print!("{}", format_cache_stats(stats));
}
