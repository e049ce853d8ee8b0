//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a crawl:
//! run information, tree statistics, occurrence warnings, and the anomaly
//! that aborted the run, if any.

use crate::output::{CrawlSummary, OutputResult};
use crate::state::DocumentState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Occurrence warnings listed before truncating
const MAX_WARNINGS: usize = 50;

/// Generates a markdown summary file
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.statistics;
    let counters = &stats.counters;
    let mut md = String::new();

    md.push_str(&format!("# {} Crawl Summary\n\n", summary.channel_title));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at));
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        summary.duration_seconds,
        summary.duration_seconds as f64 / 60.0
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if summary.cancelled {
        md.push_str("- **Cancelled**: yes\n");
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    if let Some(anomaly) = &summary.anomaly {
        md.push_str("## Anomaly\n\n");
        md.push_str(&format!("{}\n\n", anomaly));
    }

    // Tree statistics
    md.push_str("## Tree\n\n");
    md.push_str(&format!("- **Topics**: {}\n", stats.total_topics));
    md.push_str(&format!("- **Documents Reached**: {}\n", stats.total_documents));
    md.push_str(&format!("- **Attachments**: {}\n", stats.total_attachments));
    md.push_str(&format!("- **Shared Documents**: {}\n", stats.shared_documents));
    md.push_str(&format!(
        "- **Confirmation Rate**: {:.2}%\n\n",
        stats.confirmation_rate()
    ));

    md.push_str("## Document State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    for state in DocumentState::all_states() {
        md.push_str(&format!("| {} | {} |\n", state, stats.count(state)));
    }
    md.push('\n');

    if !stats.attachments_by_origin.is_empty() {
        md.push_str("## Attachments by Origin\n\n");
        md.push_str("| Origin | Attachments |\n");
        md.push_str("|--------|-------------|\n");
        for (origin, count) in &stats.attachments_by_origin {
            md.push_str(&format!("| {} | {} |\n", origin, count));
        }
        md.push('\n');
    }

    if !stats.documents_by_format.is_empty() {
        md.push_str("## Formats\n\n");
        for (format, count) in &stats.documents_by_format {
            md.push_str(&format!("- {}: {}\n", format, count));
        }
        md.push('\n');
    }

    // Run loop counters
    md.push_str("## Fetching\n\n");
    md.push_str(&format!("- **Pages Fetched**: {}\n", counters.pages_fetched));
    md.push_str(&format!("- **Fetch Failures**: {}\n", counters.fetch_failures));
    md.push_str(&format!("- **Parse Failures**: {}\n", counters.parse_failures));
    md.push_str(&format!("- **Items Enqueued**: {}\n", counters.items_enqueued));
    md.push_str(&format!(
        "- **Duplicate Pages Skipped**: {}\n",
        counters.items_deduplicated
    ));
    md.push_str(&format!(
        "- **\"See More\" Controls Skipped**: {}\n",
        counters.controls_skipped
    ));
    if counters.items_abandoned > 0 {
        md.push_str(&format!("- **Items Abandoned**: {}\n", counters.items_abandoned));
    }
    md.push('\n');

    if !summary.warnings.is_empty() {
        md.push_str("## Occurrence Warnings\n\n");
        md.push_str("| Document | Title | Occurrences |\n");
        md.push_str("|----------|-------|-------------|\n");

        let mut warnings: Vec<_> = summary.warnings.iter().collect();
        warnings.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

        for warning in warnings.iter().take(MAX_WARNINGS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                warning.key, warning.title, warning.count
            ));
        }
        if warnings.len() > MAX_WARNINGS {
            md.push_str(&format!("\n... and {} more\n", warnings.len() - MAX_WARNINGS));
        }
        md.push('\n');
    }

    md
}
