//! Process command - extract data from a single receipt file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::{
    BatchProcessor, Extractor, FileTask, GeminiExtractor, MediaKind, UsageTracker, estimate_cost,
    normalize,
};

use super::config::load_config;
use crate::report::print_usage;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (JPEG, PNG or PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the cleaned model response instead of the flattened record
    #[arg(long)]
    raw: bool,

    /// Show token usage and estimated cost
    #[arg(long)]
    usage: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let Some(kind) = MediaKind::from_path(&args.input) else {
        anyhow::bail!("Unsupported file type: {}", args.input.display());
    };

    info!("Processing file: {}", args.input.display());

    let data = fs::read(&args.input)?;
    let task = FileTask::new(args.input.display().to_string(), kind, data);
    let processor = BatchProcessor::new(GeminiExtractor::from_config(&config.extraction)?);
    let mut usage = UsageTracker::new();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Extracting {}...", task.filename()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let (output, failed) = if args.raw {
        let extraction = processor
            .extractor()
            .extract(&task.data, task.kind, task.filename())
            .await;
        pb.finish_and_clear();

        let extraction = extraction.map_err(|e| anyhow::anyhow!("Processing failed: {}", e))?;
        if let Some(tokens) = &extraction.usage {
            usage.add_task_usage(&task, tokens);
        }
        (normalize(Some(&extraction.text)).unwrap_or_default(), false)
    } else {
        let row = processor.process_task(&task, &mut usage).await;
        pb.finish_and_clear();
        (serde_json::to_string_pretty(&row)?, row.is_error())
    };

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.usage {
        let summary = usage.summary();
        print_usage(&summary, &estimate_cost(&summary));
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if failed {
        anyhow::bail!("Processing failed for {}", args.input.display());
    }

    Ok(())
}
