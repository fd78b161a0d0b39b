use std::path::PathBuf;

use thiserror::Error;

/// Per-file conversion failure, classified by pipeline stage. In batch mode
/// the driver reports the failure and moves on to the next input.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input is missing, unreadable, or not a well-formed EPUB container.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A container entry could not be read or extracted.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The rendering engine rejected the assembled document.
    #[error("render failed: {0}")]
    Render(String),

    /// The output destination could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}
