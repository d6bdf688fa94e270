//! Table writers and readers for XLSX, CSV and JSON.

use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use serde_json::{Map, Value};

use rcpt_core::ResultTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Excel workbook
    Xlsx,
    /// Comma-separated values
    Csv,
    /// JSON array of objects
    Json,
}

impl OutputFormat {
    /// Parse a format name such as `xlsx` or `.csv`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim_start_matches('.').to_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    /// Pick the format: explicit flag, then output extension, then config default.
    pub fn resolve(
        flag: Option<Self>,
        output: Option<&Path>,
        default_name: &str,
    ) -> anyhow::Result<Self> {
        if let Some(format) = flag {
            return Ok(format);
        }
        if let Some(format) = output.and_then(Self::from_path) {
            return Ok(format);
        }
        Self::from_name(default_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format in config: {}", default_name))
    }
}

/// Write `table` to `path` in the given format.
pub fn write_table(
    table: &ResultTable,
    path: &Path,
    format: OutputFormat,
    sheet_name: &str,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Xlsx => write_xlsx(table, path, sheet_name),
        OutputFormat::Csv => write_csv(table, path),
        OutputFormat::Json => write_json(table, path),
    }
}

fn write_xlsx(table: &ResultTable, path: &Path, sheet_name: &str) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name.as_str(), &header_format)?;
    }

    for (row, cells) in table.rows().enumerate() {
        for (col, cell) in cells.into_iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string(row as u32 + 1, col as u16, cell)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_csv(table: &ResultTable, path: &Path) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    if !table.columns().is_empty() {
        wtr.write_record(table.columns())?;
        for cells in table.rows() {
            wtr.write_record(cells)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_json(table: &ResultTable, path: &Path) -> anyhow::Result<()> {
    let records: Vec<Map<String, Value>> = table
        .records()
        .map(|cells| {
            cells
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect()
        })
        .collect();

    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    Ok(())
}

/// Read a previously exported CSV or JSON table.
pub fn read_table(path: &Path) -> anyhow::Result<ResultTable> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Csv) => read_csv(path),
        Some(OutputFormat::Json) => read_json(path),
        _ => anyhow::bail!(
            "Cannot read {}: expected a .csv or .json table",
            path.display()
        ),
    }
}

fn read_csv(path: &Path) -> anyhow::Result<ResultTable> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let mut table = ResultTable::new();

    for record in rdr.records() {
        let record = record?;
        table.push_record(headers.iter().zip(record.iter()));
    }

    Ok(table)
}

fn read_json(path: &Path) -> anyhow::Result<ResultTable> {
    let content = fs::read_to_string(path)?;
    let records: Vec<Map<String, Value>> = serde_json::from_str(&content)?;
    let mut table = ResultTable::new();

    for record in records {
        table.push_record(record.into_iter().map(|(key, value)| {
            let cell = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, cell)
        }));
    }

    Ok(table)
}
