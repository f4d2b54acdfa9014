//! Path helpers for turning logical asset names into public URLs and
//! physical output paths.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::{Path, PathBuf};

use crate::config::SassConfig;

/// Kinds of assets that have a dedicated path helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    Javascript,
    Stylesheet,
    Font,
}

impl AssetKind {
    /// Extension appended to sources that have none (`app` -> `app.js`).
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            AssetKind::Javascript => Some("js"),
            AssetKind::Stylesheet => Some("css"),
            _ => None,
        }
    }
}

/// Computes public URLs and source paths for assets.
pub trait PathHelperProvider: Send + Sync {
    /// Public URL for `source` served under `prefix`.
    ///
    /// `ext` is appended when the source has no extension.
    fn compute_public_path(&self, source: &str, prefix: &str, ext: Option<&str>) -> String;

    /// Physical path that `source` compiles to, with extension `ext`.
    fn compute_source_path(&self, source: &str, prefix: &str, ext: &str) -> PathBuf;

    /// Public URL for an asset of a given kind.
    fn asset_path(&self, source: &str, kind: AssetKind, prefix: &str) -> String {
        self.compute_public_path(source, prefix, kind.default_extension())
    }
}

/// Default path helpers: a fixed assets directory and optional asset host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPathHelpers {
    assets_dir: PathBuf,
    host: Option<String>,
}

impl StaticPathHelpers {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            host: None,
        }
    }

    pub fn from_config(config: &SassConfig) -> Self {
        Self {
            assets_dir: config.assets_dir.clone(),
            host: config.host.clone(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl PathHelperProvider for StaticPathHelpers {
    fn compute_public_path(&self, source: &str, prefix: &str, ext: Option<&str>) -> String {
        if is_uri(source) {
            return source.to_string();
        }

        let source = match ext {
            Some(ext) if !has_extension(source) => format!("{}.{}", source, ext),
            _ => source.to_string(),
        };

        let path = if source.starts_with('/') {
            source
        } else {
            format!("{}/{}", prefix.trim_end_matches('/'), source)
        };

        match &self.host {
            Some(host) => format!("{}{}", host.trim_end_matches('/'), path),
            None => path,
        }
    }

    fn compute_source_path(&self, source: &str, prefix: &str, ext: &str) -> PathBuf {
        let suffix = format!(".{}", ext);
        let source = if source.ends_with(&suffix) {
            source.to_string()
        } else {
            format!("{}{}", source, suffix)
        };
        self.assets_dir
            .join(prefix.trim_start_matches('/'))
            .join(source.trim_start_matches('/'))
    }
}

fn is_uri(source: &str) -> bool {
    source.contains("://") || source.starts_with("//") || source.starts_with("data:")
}

fn has_extension(source: &str) -> bool {
    Path::new(source).extension().is_some()
}
