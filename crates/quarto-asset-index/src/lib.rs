/*
 * quarto-asset-index
 * Copyright (c) 2025 Posit, PBC
 *
 * Virtual asset index for static-asset pipelines.
 *
 * This crate provides a trait-based abstraction over a project's asset files,
 * decoupled from the real filesystem layout:
 *
 * - AssetIndex: stat, candidate enumeration and content-type introspection
 * - MimeRegistry: extension to content-type mapping (format vs. engine extensions)
 * - MemoryIndex: in-memory implementation, optionally loaded from a directory
 */

mod memory;
mod mime;
mod traits;

pub use memory::{MemoryIndex, normalize_path};
pub use mime::{ContentType, MimeRegistry, PathAttributes};
pub use traits::{AssetIndex, Candidates, IndexEntry, IndexError, IndexResult};
