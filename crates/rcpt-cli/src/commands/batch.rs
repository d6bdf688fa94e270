//! Batch processing command for multiple receipt files.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use rcpt_core::{
    BatchObserver, BatchProcessor, BatchProgress, GeminiExtractor, ResultRow, ResultTable,
    UsageTracker, collect_tasks, estimate_cost,
};

use super::config::load_config;
use crate::output::{OutputFormat, write_table};
use crate::report::{print_usage, write_usage};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files, directories, zip archives or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (default: results.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: output file extension, then config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Show token usage and estimated cost
    #[arg(long)]
    usage: bool,

    /// Write token usage and estimated cost as JSON
    #[arg(long)]
    usage_report: Option<PathBuf>,
}

/// Drives the progress bar from batch progress updates.
struct ProgressReporter {
    bar: ProgressBar,
}

impl BatchObserver for ProgressReporter {
    fn on_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar
            .set_message(format!("Starting processing of {} files...", total));
    }

    fn on_file_complete(&mut self, progress: &BatchProgress<'_>) {
        let mark = if progress.succeeded {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let line = format!(
            "  {} {} ({:.1}s)",
            mark,
            progress.filename,
            progress.elapsed.as_secs_f64()
        );
        // A hidden bar drops println output.
        if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
        self.bar.set_position(progress.processed as u64);
        self.bar.set_message(format!(
            "Est. time left: {:.1}s",
            progress.eta.as_secs_f64()
        ));
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let format = OutputFormat::resolve(
        args.format,
        args.output.as_deref(),
        &config.export.default_format,
    )?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("results.{}", format.extension())));

    // Expand inputs and collect tasks
    let paths = expand_inputs(&args.inputs)?;
    let inputs = collect_tasks(&paths);

    for skipped in &inputs.skipped {
        println!(
            "{} Skipping {}: {}",
            style("⚠").yellow(),
            skipped.source,
            skipped.reason
        );
    }

    if inputs.tasks.is_empty() {
        anyhow::bail!("No valid files found to process.");
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        inputs.tasks.len()
    );

    let processor = BatchProcessor::new(GeminiExtractor::from_config(&config.extraction)?);
    let mut usage = UsageTracker::new();

    let bar = ProgressBar::new(inputs.tasks.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );
    let mut reporter = ProgressReporter { bar };

    let report = processor.run(inputs.tasks, &mut usage, &mut reporter).await;
    reporter.bar.finish_with_message("Complete");

    // Write the result table
    let table = ResultTable::from_rows(&report.rows);
    write_table(&table, &output_path, format, &config.export.sheet_name)?;
    debug!("Wrote {} rows to {}", table.len(), output_path.display());

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.rows.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(report.succeeded()).green(),
        style(report.failed()).red()
    );
    println!(
        "{} Results written to {}",
        style("✓").green(),
        output_path.display()
    );

    if report.failed() > 0 {
        println!();
        println!("{}", style("Failed files:").red());
        for row in report.errors() {
            if let ResultRow::Error { filename, error } = row {
                println!("  - {}: {}", filename, error);
            }
        }
    }

    let summary = usage.summary();
    let cost = estimate_cost(&summary);

    if args.usage {
        print_usage(&summary, &cost);
    }

    if let Some(path) = &args.usage_report {
        write_usage(path, &summary, &cost)?;
        println!(
            "{} Usage report written to {}",
            style("✓").green(),
            path.display()
        );
    }

    Ok(())
}

/// Expand glob patterns; other inputs are taken as paths.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let before = paths.len();
        paths.extend(glob(input)?.filter_map(|r| r.ok()));
        if paths.len() == before {
            warn!("No files match pattern: {}", input);
        }
    }

    Ok(paths)
}
