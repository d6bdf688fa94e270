//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Extraction service error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Input discovery error.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by a single call to the extraction service.
///
/// The batch orchestrator never propagates these: each one becomes an
/// error row for the file that caused it.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The response contained no candidate text part.
    #[error("response has no text")]
    MissingText,

    /// The response text was empty.
    #[error("empty response")]
    EmptyResponse,
}

/// Errors related to collecting input files.
#[derive(Error, Debug)]
pub enum InputError {
    /// File extension is not one of the recognized document types.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The zip archive could not be read.
    #[error("failed to read archive {path}: {reason}")]
    Archive { path: String, reason: String },

    /// The input exists but could not be read.
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// The input path does not exist.
    #[error("input not found: {0}")]
    NotFound(String),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
