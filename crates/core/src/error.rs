//! Error types for deck conversion.
//!
//! Malformed markup is never an error: the Markdown parser and the chart
//! table parser always produce a value. Errors are reserved for missing
//! inputs and failing collaborators (PDF backend, template archive,
//! renderer, content provider).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input file does not exist.
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The PDF could not be loaded or a page could not be read.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// An embedded image could not be decoded or re-encoded.
    #[error("Image error: {0}")]
    Image(String),

    /// ZIP archive error (for PPTX templates).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error (for PPTX templates).
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// The template is missing a part or layout we need.
    #[error("Template error: {0}")]
    Template(String),

    /// The presentation renderer rejected an operation.
    #[error("Render error: {0}")]
    Render(String),

    /// The generative content provider failed.
    #[error("Content provider error: {0}")]
    Provider(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
