//! Document extraction through a multimodal model.

mod gemini;
mod prompt;

pub use gemini::GeminiExtractor;
pub use prompt::EXTRACTION_PROMPT;

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::input::MediaKind;
use crate::usage::TokenUsage;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Raw model output for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Response text, not yet normalized.
    pub text: String,
    /// Token usage, when the service reports it.
    pub usage: Option<TokenUsage>,
}

/// A service that turns document bytes into structured text.
///
/// One call per document. Implementations do not retry; any failure fails
/// that document for the current batch.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract receipt data from `data`. `filename` is used for logging only.
    async fn extract(&self, data: &[u8], kind: MediaKind, filename: &str) -> Result<Extraction>;
}
