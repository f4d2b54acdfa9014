//! The compilation scope a resolver is bound to.
//!
//! Copyright (c) 2025 Posit, PBC

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use quarto_asset_index::{AssetIndex, ContentType};

use crate::config::SassConfig;
use crate::paths::{AssetKind, PathHelperProvider};

/// Immutable snapshot of the file currently being compiled.
///
/// Holds the asset index, path helpers and configuration together with the
/// current output content type and the location of the current file. The
/// parent directory of `pathname` is the base for relative lookups.
#[derive(Clone)]
pub struct ResolverContext<'a> {
    index: &'a dyn AssetIndex,
    paths: &'a dyn PathHelperProvider,
    config: &'a SassConfig,
    content_type: ContentType,
    logical_path: String,
    pathname: PathBuf,
}

impl<'a> ResolverContext<'a> {
    /// Create a context for the file at `pathname` with the given logical path.
    ///
    /// The output content type defaults to `text/css`.
    pub fn new(
        index: &'a dyn AssetIndex,
        paths: &'a dyn PathHelperProvider,
        config: &'a SassConfig,
        pathname: impl Into<PathBuf>,
        logical_path: impl Into<String>,
    ) -> Self {
        Self {
            index,
            paths,
            config,
            content_type: ContentType::CSS,
            logical_path: logical_path.into(),
            pathname: pathname.into(),
        }
    }

    /// Override the output content type of the current compilation.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn index(&self) -> &'a dyn AssetIndex {
        self.index
    }

    pub fn paths(&self) -> &'a dyn PathHelperProvider {
        self.paths
    }

    pub fn config(&self) -> &'a SassConfig {
        self.config
    }

    /// Content type the current compilation produces.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Logical path of the current file (e.g. `styles/application`).
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// Virtual path of the current file.
    pub fn pathname(&self) -> &Path {
        &self.pathname
    }

    /// Directory relative references are resolved against.
    pub fn base_path(&self) -> &Path {
        self.pathname.parent().unwrap_or_else(|| Path::new("/"))
    }

    pub fn image_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Image)
    }

    pub fn video_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Video)
    }

    pub fn audio_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Audio)
    }

    pub fn javascript_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Javascript)
    }

    pub fn stylesheet_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Stylesheet)
    }

    pub fn font_path(&self, source: &str) -> String {
        self.asset_path(source, AssetKind::Font)
    }

    fn asset_path(&self, source: &str, kind: AssetKind) -> String {
        self.paths.asset_path(source, kind, &self.config.prefix)
    }
}

impl Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverContext")
            .field("index", &"<AssetIndex>")
            .field("content_type", &self.content_type)
            .field("logical_path", &self.logical_path)
            .field("pathname", &self.pathname)
            .finish()
    }
}
