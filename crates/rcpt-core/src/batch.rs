//! Sequential batch processing with progress and ETA reporting.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::extraction::Extractor;
use crate::input::FileTask;
use crate::models::record::{FlatRecord, PROCESSING_FAILED, ResultRow, parse_response};
use crate::normalize::normalize;
use crate::usage::UsageTracker;

/// Progress after a file has been processed.
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    /// Files processed so far, including this one.
    pub processed: usize,
    pub total: usize,
    /// Base name of the file just processed.
    pub filename: &'a str,
    /// Whether the file produced a record rather than an error row.
    pub succeeded: bool,
    /// Time spent on this file.
    pub elapsed: Duration,
    /// Mean time per file so far.
    pub average: Duration,
    /// Estimated time for the remaining files.
    pub eta: Duration,
    /// Names of all files processed so far, in order.
    pub completed: &'a [String],
}

impl BatchProgress<'_> {
    /// Fraction of the batch done, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Receives progress updates while a batch runs.
pub trait BatchObserver {
    /// Called once before the first file.
    fn on_start(&mut self, _total: usize) {}

    /// Called after every file, in input order.
    fn on_file_complete(&mut self, progress: &BatchProgress<'_>);
}

/// Observer that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_file_complete(&mut self, _progress: &BatchProgress<'_>) {}
}

/// Outcome of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One row per task, in input order.
    pub rows: Vec<ResultRow>,
    /// Time spent on each task, in input order.
    pub durations: Vec<Duration>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_error()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_error()).count()
    }

    /// Error rows only.
    pub fn errors(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.is_error())
    }

    /// Sum of per-file durations.
    pub fn total_duration(&self) -> Duration {
        self.durations.iter().sum()
    }
}

/// Runs extraction over a list of files, one at a time.
pub struct BatchProcessor<E> {
    extractor: E,
}

impl<E: Extractor> BatchProcessor<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Borrow the underlying extractor.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Process `tasks` in order.
    ///
    /// `usage` is reset before the first file and receives the usage of
    /// every extraction the service reported it for. Failures never stop
    /// the batch: each one becomes an error row.
    pub async fn run<O>(
        &self,
        tasks: Vec<FileTask>,
        usage: &mut UsageTracker,
        observer: &mut O,
    ) -> BatchReport
    where
        O: BatchObserver + ?Sized,
    {
        let total = tasks.len();
        let started_at = Utc::now();
        let mut rows = Vec::with_capacity(total);
        let mut durations: Vec<Duration> = Vec::with_capacity(total);
        let mut completed = Vec::with_capacity(total);

        usage.reset();
        observer.on_start(total);
        info!("Starting batch of {} files", total);

        for task in tasks {
            let start = Instant::now();
            let row = self.process_task(&task, usage).await;
            let elapsed = start.elapsed();

            durations.push(elapsed);
            completed.push(task.filename().to_string());

            let processed = completed.len();
            let average = durations.iter().sum::<Duration>() / processed as u32;
            let eta = average * (total - processed) as u32;

            let progress = BatchProgress {
                processed,
                total,
                filename: task.filename(),
                succeeded: !row.is_error(),
                elapsed,
                average,
                eta,
                completed: &completed,
            };
            debug!(
                "Processed {}/{} ({}) in {:?}, ETA {:?}",
                processed, total, progress.filename, elapsed, eta
            );
            observer.on_file_complete(&progress);

            rows.push(row);
        }

        let report = BatchReport {
            rows,
            durations,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// Extract, normalize, parse and flatten a single file.
    ///
    /// Usage is recorded for any successful extraction, even when the
    /// response later fails to parse.
    pub async fn process_task(&self, task: &FileTask, usage: &mut UsageTracker) -> ResultRow {
        let filename = task.filename();

        let extraction = match self.extractor.extract(&task.data, task.kind, filename).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Extraction failed for {}: {}", task.source, e);
                return ResultRow::error(filename, PROCESSING_FAILED);
            }
        };

        if let Some(tokens) = &extraction.usage {
            usage.add_task_usage(task, tokens);
        }

        let text = normalize(Some(&extraction.text)).unwrap_or_default();
        match parse_response(&text) {
            Ok(receipt) => ResultRow::Record(FlatRecord::from_receipt(&receipt, filename)),
            Err(e) => {
                warn!("Could not parse response for {}: {}", task.source, e);
                ResultRow::error(filename, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::extraction::{Extraction, Result as ExtractionResult};
    use crate::input::{ImageFormat, MediaKind};
    use crate::usage::TokenUsage;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table keyed by filename.
    #[derive(Default)]
    struct ScriptedExtractor {
        responses: HashMap<String, Option<Extraction>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedExtractor {
        fn respond(mut self, filename: &str, text: &str, usage: Option<TokenUsage>) -> Self {
            self.responses.insert(
                filename.to_string(),
                Some(Extraction {
                    text: text.to_string(),
                    usage,
                }),
            );
            self
        }

        fn fail(mut self, filename: &str) -> Self {
            self.responses.insert(filename.to_string(), None);
            self
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn extract(
            &self,
            _data: &[u8],
            _kind: MediaKind,
            filename: &str,
        ) -> ExtractionResult<Extraction> {
            self.calls.lock().unwrap().push(filename.to_string());
            self.responses
                .get(filename)
                .cloned()
                .flatten()
                .ok_or_else(|| ExtractionError::Request("connection reset".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        started_with: Option<usize>,
        processed: Vec<usize>,
        etas: Vec<Duration>,
        completed_lens: Vec<usize>,
        succeeded: Vec<bool>,
    }

    impl BatchObserver for RecordingObserver {
        fn on_start(&mut self, total: usize) {
            self.started_with = Some(total);
        }

        fn on_file_complete(&mut self, progress: &BatchProgress<'_>) {
            self.processed.push(progress.processed);
            self.etas.push(progress.eta);
            self.completed_lens.push(progress.completed.len());
            self.succeeded.push(progress.succeeded);
        }
    }

    fn image(name: &str) -> FileTask {
        FileTask::new(
            format!("/uploads/{name}"),
            MediaKind::Image(ImageFormat::Png),
            vec![0u8; 64],
        )
    }

    fn usage(total: u64) -> Option<TokenUsage> {
        Some(TokenUsage {
            input_tokens: total - 100,
            output_tokens: 100,
            total_tokens: total,
        })
    }

    #[tokio::test]
    async fn test_failed_extraction_becomes_error_row() {
        let extractor = ScriptedExtractor::default()
            .respond("one.png", r#"{"amount": "1,00"}"#, usage(1_000))
            .fail("two.png")
            .respond("three.png", r#"{"amount": "3,00"}"#, usage(1_200));
        let processor = BatchProcessor::new(extractor);
        let mut tracker = UsageTracker::new();
        let mut observer = RecordingObserver::default();

        let report = processor
            .run(
                vec![image("one.png"), image("two.png"), image("three.png")],
                &mut tracker,
                &mut observer,
            )
            .await;

        assert_eq!(report.rows.len(), 3);
        assert!(!report.rows[0].is_error());
        assert_eq!(report.rows[1], ResultRow::error("two.png", "Processing failed"));
        assert!(!report.rows[2].is_error());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.durations.len(), 3);

        assert_eq!(observer.started_with, Some(3));
        assert_eq!(observer.processed, vec![1, 2, 3]);
        assert_eq!(observer.completed_lens, vec![1, 2, 3]);
        assert_eq!(observer.succeeded, vec![true, false, true]);
        assert_eq!(observer.etas.last(), Some(&Duration::ZERO));

        let summary = tracker.summary();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.total_tokens, 2_200);
    }

    #[tokio::test]
    async fn test_rows_keep_input_order() {
        let extractor = ScriptedExtractor::default()
            .respond("c.png", "{}", None)
            .respond("a.png", "{}", None)
            .respond("b.png", "{}", None);
        let processor = BatchProcessor::new(extractor);

        let report = processor
            .run(
                vec![image("c.png"), image("a.png"), image("b.png")],
                &mut UsageTracker::new(),
                &mut NoopObserver,
            )
            .await;

        let names: Vec<_> = report.rows.iter().map(|r| r.filename()).collect();
        assert_eq!(names, vec!["c.png", "a.png", "b.png"]);
        assert_eq!(
            *processor.extractor().calls.lock().unwrap(),
            vec!["c.png", "a.png", "b.png"]
        );
    }

    #[tokio::test]
    async fn test_parse_failure_row_carries_error_text() {
        let extractor = ScriptedExtractor::default().respond(
            "bad.png",
            "Sorry, I cannot read this receipt.",
            usage(900),
        );
        let processor = BatchProcessor::new(extractor);
        let mut tracker = UsageTracker::new();

        let report = processor
            .run(vec![image("bad.png")], &mut tracker, &mut NoopObserver)
            .await;

        match &report.rows[0] {
            ResultRow::Error { filename, error } => {
                assert_eq!(filename, "bad.png");
                assert_ne!(error, PROCESSING_FAILED);
                assert!(error.contains("line 1"), "unexpected error text: {error}");
            }
            other => panic!("expected error row, got {other:?}"),
        }

        // The call itself succeeded, so its usage still counts.
        assert_eq!(tracker.summary().file_count, 1);
    }

    #[tokio::test]
    async fn test_sender_only_receipt_end_to_end() {
        let response = "```json\n{\n  \"sender\": {\"name\": \"Alice\"},\n  \"amount\": \"50,00\"\n}\n```";
        let extractor = ScriptedExtractor::default().respond("pix.jpg", response, usage(1_500));
        let processor = BatchProcessor::new(extractor);
        let task = FileTask::new(
            "/home/user/receipts/pix.jpg",
            MediaKind::Image(ImageFormat::Jpeg),
            vec![0xff, 0xd8],
        );
        let mut tracker = UsageTracker::new();

        let report = processor
            .run(vec![task], &mut tracker, &mut NoopObserver)
            .await;

        let ResultRow::Record(record) = &report.rows[0] else {
            panic!("expected a record, got {:?}", report.rows[0]);
        };
        assert_eq!(record.sender_name, "Alice");
        assert_eq!(record.recipient_name, "");
        assert_eq!(record.recipient_pix_key, "");
        assert_eq!(record.amount, "50,00");
        assert_eq!(record.filename, "pix.jpg");

        let summary = tracker.summary();
        assert_eq!(summary.files[0].file_size, 2);
        assert_eq!(summary.files[0].file_type, "image");
    }

    #[tokio::test]
    async fn test_tracker_is_reset_per_batch() {
        let extractor = ScriptedExtractor::default().respond("a.png", "{}", usage(500));
        let processor = BatchProcessor::new(extractor);
        let mut tracker = UsageTracker::new();
        tracker.add_usage("stale.png", 1, 1, 2, 1, "image");

        processor
            .run(vec![image("a.png")], &mut tracker, &mut NoopObserver)
            .await;
        processor
            .run(vec![image("a.png")], &mut tracker, &mut NoopObserver)
            .await;

        let summary = tracker.summary();
        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.files[0].filename, "a.png");
        assert_eq!(summary.total_tokens, 500);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let processor = BatchProcessor::new(ScriptedExtractor::default());
        let mut observer = RecordingObserver::default();

        let report = processor
            .run(Vec::new(), &mut UsageTracker::new(), &mut observer)
            .await;

        assert!(report.rows.is_empty());
        assert_eq!(report.total_duration(), Duration::ZERO);
        assert_eq!(observer.started_with, Some(0));
        assert!(observer.processed.is_empty());
    }

    #[test]
    fn test_progress_fraction() {
        let completed = vec!["a.png".to_string()];
        let progress = BatchProgress {
            processed: 1,
            total: 4,
            filename: "a.png",
            succeeded: true,
            elapsed: Duration::from_millis(10),
            average: Duration::from_millis(10),
            eta: Duration::from_millis(30),
            completed: &completed,
        };
        assert_eq!(progress.fraction(), 0.25);
    }
}
