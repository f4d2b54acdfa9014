//! SASS/SCSS template adapter for static-asset pipelines.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - `AssetResolver`: resolves relative/absolute asset references against a
//!   virtual index, enforcing content-type consistency
//! - `AssetImporter`: the grass import hook backed by the resolver
//! - `SassTemplate`: compiles `.sass`/`.scss` sources with the resolver wired in
//! - Path helpers for public URLs and compiled output paths

mod config;
mod context;
mod error;
mod importer;
mod paths;
mod resolver;
mod template;

pub use config::{OutputStyle, SassConfig};
pub use context::ResolverContext;
pub use error::{CompilerError, ResolveError, SassError};
pub use importer::{AssetImporter, IMPORTER_ROOT};
pub use paths::{AssetKind, PathHelperProvider, StaticPathHelpers};
pub use resolver::{AssetResolver, ContentTypeHint};
pub use template::{
    CompiledOutput, CompilerOptions, CustomData, Dialect, DialectSettings, ImportPath,
    SassTemplate, render,
};

// The index types appear throughout the public API
pub use quarto_asset_index::{AssetIndex, ContentType, IndexEntry, MemoryIndex};
