/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the AssetIndex trait and supporting types for the virtual asset index.
 *
 * An index is a read-only view over asset files that may live on disk, in
 * memory, or inside a dependency bundle. Consumers only ever see virtual
 * paths and IndexEntry handles.
 */

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mime::{ContentType, MimeRegistry, PathAttributes};

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur while reading from an index
#[derive(Debug, Error)]
pub enum IndexError {
    /// No file exists at the given virtual path
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading the backing file failed
    #[error("Failed to read asset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Walking a directory tree failed
    #[error("Failed to scan asset directory {}: {message}", .path.display())]
    Scan { path: PathBuf, message: String },

    /// The file is not valid UTF-8 text
    #[error("Asset is not valid UTF-8: {}", .0.display())]
    InvalidUtf8(PathBuf),
}

/// A concrete backing file found in an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    /// Normalized absolute virtual path of the file.
    pub path: PathBuf,
    /// Path relative to the root or base directory the file was found under.
    pub logical_path: String,
}

impl IndexEntry {
    pub fn new(path: impl Into<PathBuf>, logical_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            logical_path: logical_path.into(),
        }
    }

    /// An entry for an absolute path that is its own logical path.
    pub fn from_absolute(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            logical_path: path.to_string_lossy().into_owned(),
        }
    }
}

/// Lazy, finite sequence of candidate entries.
///
/// Calling `resolve_candidates` again restarts the enumeration.
pub type Candidates<'a> = Box<dyn Iterator<Item = IndexEntry> + 'a>;

/// Read-only operations over a virtual asset index.
///
/// Implementations must not mutate themselves while answering queries, so
/// that resolution is a pure function of its inputs and the index contents.
pub trait AssetIndex: Send + Sync {
    /// The extension registry used for content-type introspection.
    fn registry(&self) -> &MimeRegistry;

    /// Check whether a file exists at the given path.
    ///
    /// Relative paths are checked against each root of the index.
    fn stat(&self, path: &Path) -> bool;

    /// Check whether a directory exists at the given path.
    fn is_dir(&self, path: &Path) -> bool;

    /// Enumerate files matching a logical reference.
    ///
    /// `base_path` is the directory of the referencing file. Several entries
    /// may share a logical name with different extensions; they are yielded in
    /// the index's enumeration order.
    fn resolve_candidates<'a>(&'a self, reference: &Path, base_path: &Path) -> Candidates<'a>;

    /// Read the contents of an entry.
    fn read(&self, entry: &IndexEntry) -> IndexResult<Vec<u8>> {
        self.read_path(&entry.path)
    }

    /// Read the contents of the file at a virtual path.
    fn read_path(&self, path: &Path) -> IndexResult<Vec<u8>>;

    /// Read an entry as UTF-8 text.
    fn read_string(&self, entry: &IndexEntry) -> IndexResult<String> {
        let bytes = self.read(entry)?;
        String::from_utf8(bytes).map_err(|_| IndexError::InvalidUtf8(entry.path.clone()))
    }

    /// What the path's extensions say about it.
    fn attributes_for(&self, path: &Path) -> PathAttributes {
        self.registry().attributes_for(path)
    }

    /// The content type of a concrete entry.
    fn content_type_of(&self, entry: &IndexEntry) -> ContentType {
        self.registry().content_type_of(&entry.path)
    }
}
