//! Error types for asset resolution and SASS compilation.
//!
//! Copyright (c) 2025 Posit, PBC

use std::fmt;
use std::path::PathBuf;

use quarto_asset_index::{ContentType, IndexError};
use thiserror::Error;

/// Errors from strict asset resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No backing file matches the reference under the current constraints
    #[error("couldn't find file '{reference}'")]
    NotFound { reference: String },

    /// The reference's extension implies a different content type than requested
    #[error("{reference} is '{actual}', not '{expected}'")]
    ContentTypeMismatch {
        reference: String,
        actual: ContentType,
        expected: ContentType,
    },
}

impl ResolveError {
    /// The reference that failed to resolve.
    pub fn reference(&self) -> &str {
        match self {
            ResolveError::NotFound { reference } => reference,
            ResolveError::ContentTypeMismatch { reference, .. } => reference,
        }
    }
}

/// A failure reported by the SASS compiler.
///
/// Location fields point at the evaluated template when the error is in the
/// root stylesheet, otherwise at the imported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerError {
    /// The compiler's message, verbatim.
    pub message: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Import resolutions that failed during this compile and relate to the error.
    pub unresolved: Vec<ResolveError>,
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        write!(f, ": {}", self.message)?;
        for failure in &self.unresolved {
            write!(f, "\n  caused by: {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

/// Errors that can occur during SASS template operations
#[derive(Debug, Error)]
pub enum SassError {
    /// SASS compilation failed
    #[error("SASS compilation failed: {0}")]
    Compilation(#[from] CompilerError),

    /// Configuration could not be loaded or parsed
    #[error("Invalid SASS configuration: {message}")]
    Config { message: String },

    /// Reading from the asset index failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// File I/O error
    #[error("Failed to read SASS configuration: {0}")]
    Io(#[from] std::io::Error),
}
