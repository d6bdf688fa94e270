//! Token usage accounting for a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::input::FileTask;

/// Token counts reported by the extraction service for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Usage recorded for a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUsage {
    pub filename: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Document size in bytes.
    pub file_size: u64,
    /// Media label, `image` or `pdf`.
    pub file_type: String,
    pub recorded_at: DateTime<Utc>,
}

/// Snapshot of accumulated usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub file_count: u64,
    pub average_tokens_per_file: f64,
    pub files: Vec<FileUsage>,
}

/// Accumulates token usage across the files of one batch.
///
/// Owned by the caller and handed to the batch processor, which resets it
/// at the start of every run.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    total_input_tokens: u64,
    total_output_tokens: u64,
    total_tokens: u64,
    file_count: u64,
    files: Vec<FileUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all counters and per-file details.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record usage for one processed file.
    pub fn add_usage(
        &mut self,
        filename: &str,
        input_tokens: u64,
        output_tokens: u64,
        total_tokens: u64,
        file_size: u64,
        file_type: &str,
    ) {
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
        self.total_tokens += total_tokens;
        self.file_count += 1;
        self.files.push(FileUsage {
            filename: filename.to_string(),
            input_tokens,
            output_tokens,
            total_tokens,
            file_size,
            file_type: file_type.to_string(),
            recorded_at: Utc::now(),
        });
    }

    /// Record the usage reported for `task`'s extraction.
    pub fn add_task_usage(&mut self, task: &FileTask, tokens: &TokenUsage) {
        self.add_usage(
            task.filename(),
            tokens.input_tokens,
            tokens.output_tokens,
            tokens.total_tokens,
            task.size(),
            task.kind.label(),
        );
    }

    /// Current totals, per-file details and the per-file average.
    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
            total_tokens: self.total_tokens,
            file_count: self.file_count,
            average_tokens_per_file: self.total_tokens as f64 / self.file_count.max(1) as f64,
            files: self.files.clone(),
        }
    }
}
