//! Export command - convert a reviewed result table to another format.

use std::path::PathBuf;

use clap::Args;
use console::style;

use super::config::load_config;
use crate::output::{OutputFormat, read_table, write_table};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Result table to read (.csv or .json)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Output format (default: output file extension, then config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

pub fn run(args: ExportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let format = OutputFormat::resolve(
        args.format,
        Some(args.output.as_path()),
        &config.export.default_format,
    )?;

    let table = read_table(&args.input)?;
    write_table(&table, &args.output, format, &config.export.sheet_name)?;

    println!(
        "{} Exported {} rows to {}",
        style("✓").green(),
        table.len(),
        args.output.display()
    );

    Ok(())
}
