//! Adapter configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! `SassConfig` is passed explicitly to the template adapter and resolver
//! context. It can be built in code or loaded from TOML:
//!
//! ```toml
//! prefix = "/assets"
//! assets_dir = "public"
//! load_paths = ["/vendor/stylesheets"]
//! style = "compressed"
//! host = "https://cdn.example.com"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SassError;

/// Output style of compiled CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl From<OutputStyle> for grass::OutputStyle {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        }
    }
}

/// Configuration for asset paths and SASS compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SassConfig {
    /// URL prefix under which compiled assets are served (e.g. `/assets`).
    pub prefix: String,

    /// Global import search paths, tried after the asset importer.
    pub load_paths: Vec<PathBuf>,

    /// Extension of compiled output files.
    pub output_extension: String,

    /// Directory that public asset paths are served from on disk.
    pub assets_dir: PathBuf,

    /// Optional asset host prepended to public paths.
    pub host: Option<String>,

    pub style: OutputStyle,

    /// Silence `@warn` and `@debug` output from the compiler.
    pub quiet: bool,
}

impl Default for SassConfig {
    fn default() -> Self {
        Self {
            prefix: "/assets".to_string(),
            load_paths: Vec::new(),
            output_extension: "css".to_string(),
            assets_dir: PathBuf::from("public"),
            host: None,
            style: OutputStyle::Expanded,
            quiet: false,
        }
    }
}

impl SassConfig {
    /// Parse configuration from a TOML string. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, SassError> {
        let config: SassConfig = toml::from_str(source).map_err(|e| SassError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SassError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source).map_err(|e| match e {
            SassError::Config { message } => SassError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Builder-style setter for the global load paths.
    pub fn with_load_paths(mut self, load_paths: Vec<PathBuf>) -> Self {
        self.load_paths = load_paths;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    fn validate(&self) -> Result<(), SassError> {
        if self.output_extension.is_empty() || self.output_extension.starts_with('.') {
            return Err(SassError::Config {
                message: format!(
                    "output_extension must be a bare extension like \"css\", got {:?}",
                    self.output_extension
                ),
            });
        }
        Ok(())
    }
}
