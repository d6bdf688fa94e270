//! Core library for receipt and invoice extraction.
//!
//! This crate provides:
//! - Input discovery for images, PDFs and zip archives
//! - A multimodal extraction client (Gemini `generateContent`)
//! - Response normalization and flattening into fixed table rows
//! - Token usage tracking and flat-rate cost estimates
//! - Sequential batch processing with progress and ETA reporting

pub mod batch;
pub mod cost;
pub mod error;
pub mod extraction;
pub mod input;
pub mod models;
pub mod normalize;
pub mod table;
pub mod usage;

pub use batch::{BatchObserver, BatchProcessor, BatchProgress, BatchReport, NoopObserver};
pub use cost::{CostSummary, FileCost, estimate_cost};
pub use error::{ExtractionError, InputError, RcptError, Result};
pub use extraction::{Extraction, Extractor, GeminiExtractor};
pub use input::{FileTask, ImageFormat, InputSet, MediaKind, SkippedInput, collect_tasks};
pub use models::config::RcptConfig;
pub use models::record::{ExtractedReceipt, FLAT_FIELDS, FlatRecord, ResultRow};
pub use normalize::normalize;
pub use table::ResultTable;
pub use usage::{TokenUsage, UsageSummary, UsageTracker};
