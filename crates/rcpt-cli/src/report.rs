//! Usage and cost reporting.

use std::fs;
use std::path::Path;

use console::style;
use serde::Serialize;

use rcpt_core::{CostSummary, UsageSummary};

/// Usage and cost written by `--usage-report`.
#[derive(Serialize)]
struct UsageReport<'a> {
    usage: &'a UsageSummary,
    cost: &'a CostSummary,
}

/// Print token totals, per-file usage and the estimated cost.
pub fn print_usage(usage: &UsageSummary, cost: &CostSummary) {
    println!();
    println!("{}", style("Token usage").bold());
    println!("  Files with usage:   {}", usage.file_count);
    println!("  Input tokens:       {}", usage.total_input_tokens);
    println!("  Output tokens:      {}", usage.total_output_tokens);
    println!("  Total tokens:       {}", usage.total_tokens);
    println!("  Average per file:   {:.1}", usage.average_tokens_per_file);

    if !usage.files.is_empty() {
        println!();
        println!(
            "  {:<32} {:>8} {:>8} {:>8} {:>10} {:<6}",
            "file", "input", "output", "total", "bytes", "type"
        );
        for file in &usage.files {
            println!(
                "  {:<32} {:>8} {:>8} {:>8} {:>10} {:<6}",
                truncate(&file.filename, 32),
                file.input_tokens,
                file.output_tokens,
                file.total_tokens,
                file.file_size,
                file.file_type
            );
        }
    }

    println!();
    println!("{}", style("Estimated cost (flat rate per file)").bold());
    println!("  Files:              {}", cost.file_count);
    println!(
        "  Per file:           ${}",
        cost.average_cost_per_file.round_dp(6)
    );
    println!(
        "  Total:              {}",
        style(format!("${}", cost.total_cost.round_dp(6))).green()
    );
}

/// Write usage and cost as pretty JSON.
pub fn write_usage(path: &Path, usage: &UsageSummary, cost: &CostSummary) -> anyhow::Result<()> {
    let report = UsageReport { usage, cost };
    fs::write(path, serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let kept: String = name.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}
