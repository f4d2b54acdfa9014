//! SASS/SCSS template adapter.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A `SassTemplate` compiles one stylesheet per call. For each compile it
//! builds a fresh [`CompilerOptions`] bundle holding a resolver bound to the
//! caller's scope, then hands the source to grass with an [`AssetImporter`]
//! placed first in the import search order.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarto_asset_sass::{ResolverContext, SassConfig, SassTemplate, StaticPathHelpers};
//!
//! let config = SassConfig::default();
//! let paths = StaticPathHelpers::from_config(&config);
//! let scope = ResolverContext::new(&index, &paths, &config, pathname, "styles/application");
//! let output = SassTemplate::scss(config.clone()).compile(source, &scope)?;
//! ```

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use quarto_asset_index::{ContentType, IndexEntry};
use regex::Regex;

use crate::config::{OutputStyle, SassConfig};
use crate::context::ResolverContext;
use crate::error::{CompilerError, ResolveError, SassError};
use crate::importer::{AssetImporter, IMPORTER_ROOT, import_stem};
use crate::resolver::AssetResolver;

/// Input dialect of a stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Whitespace-sensitive `.sass` syntax.
    Indented,
    /// Brace-delimited `.scss` syntax.
    CurlyBrace,
}

/// Per-dialect settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectSettings {
    /// Syntax name as the compiler knows it.
    pub syntax: &'static str,
    /// File extension of templates in this dialect.
    pub extension: &'static str,
}

const INDENTED: DialectSettings = DialectSettings {
    syntax: "sass",
    extension: "sass",
};

const CURLY_BRACE: DialectSettings = DialectSettings {
    syntax: "scss",
    extension: "scss",
};

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Indented, Dialect::CurlyBrace];

    pub fn settings(self) -> &'static DialectSettings {
        match self {
            Dialect::Indented => &INDENTED,
            Dialect::CurlyBrace => &CURLY_BRACE,
        }
    }

    /// The dialect registered for a template extension (with or without dot).
    pub fn from_extension(extension: &str) -> Option<Dialect> {
        let extension = extension.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.settings().extension.eq_ignore_ascii_case(extension))
    }

    fn input_syntax(self) -> grass::InputSyntax {
        match self {
            Dialect::Indented => grass::InputSyntax::Sass,
            Dialect::CurlyBrace => grass::InputSyntax::Scss,
        }
    }
}

/// One entry of the compiler's import search order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPath {
    /// The asset importer, reached through [`IMPORTER_ROOT`].
    Importer,
    /// A global load path.
    Dir(PathBuf),
}

impl ImportPath {
    fn load_path(&self) -> PathBuf {
        match self {
            ImportPath::Importer => PathBuf::from(IMPORTER_ROOT),
            ImportPath::Dir(dir) => dir.clone(),
        }
    }
}

/// Data made available to the import callback during compilation.
#[derive(Debug, Clone)]
pub struct CustomData<'a> {
    pub resolver: AssetResolver<'a>,
}

/// Options bundle built fresh for each compile call.
#[derive(Debug, Clone)]
pub struct CompilerOptions<'a> {
    /// Source file of the evaluated template, for error messages.
    pub filename: PathBuf,
    /// Physical path the compiled output will be written to.
    pub css_filename: PathBuf,
    /// Line of `filename` the template source starts at.
    pub line: usize,
    pub syntax: Dialect,
    pub style: OutputStyle,
    pub quiet: bool,
    /// Import search order; the importer always comes first.
    pub import_paths: Vec<ImportPath>,
    pub custom: CustomData<'a>,
}

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledOutput {
    pub css: String,
    pub css_filename: PathBuf,
    /// Index files read while compiling, in read order.
    pub dependencies: Vec<PathBuf>,
}

/// Template adapter for one SASS dialect.
#[derive(Debug, Clone)]
pub struct SassTemplate {
    dialect: Dialect,
    config: SassConfig,
    file: Option<PathBuf>,
    line: usize,
}

impl SassTemplate {
    pub fn new(dialect: Dialect, config: SassConfig) -> Self {
        Self {
            dialect,
            config,
            file: None,
            line: 1,
        }
    }

    /// Adapter for the indented `.sass` dialect.
    pub fn sass(config: SassConfig) -> Self {
        Self::new(Dialect::Indented, config)
    }

    /// Adapter for the `.scss` dialect.
    pub fn scss(config: SassConfig) -> Self {
        Self::new(Dialect::CurlyBrace, config)
    }

    /// Report errors against `file` instead of the scope's pathname.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Line of the file the template source starts at (1-based).
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line.max(1);
        self
    }

    pub fn default_mime_type() -> ContentType {
        ContentType::CSS
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn config(&self) -> &SassConfig {
        &self.config
    }

    /// Assemble the options bundle for compiling within `scope`.
    pub fn compiler_options<'a>(&self, scope: &ResolverContext<'a>) -> CompilerOptions<'a> {
        let resolver = AssetResolver::new(scope.clone());
        let css_filename =
            resolver.source_path(scope.logical_path(), &self.config.output_extension);

        let mut import_paths = vec![ImportPath::Importer];
        import_paths.extend(self.config.load_paths.iter().cloned().map(ImportPath::Dir));

        CompilerOptions {
            filename: self
                .file
                .clone()
                .unwrap_or_else(|| scope.pathname().to_path_buf()),
            css_filename,
            line: self.line,
            syntax: self.dialect,
            style: self.config.style,
            quiet: self.config.quiet,
            import_paths,
            custom: CustomData { resolver },
        }
    }

    /// Compile `source` within `scope`.
    pub fn compile(
        &self,
        source: &str,
        scope: &ResolverContext<'_>,
    ) -> Result<CompiledOutput, SassError> {
        let options = self.compiler_options(scope);
        render(source, &options)
    }

    /// Compile the file at the scope's pathname, reading it from the index.
    pub fn compile_file(&self, scope: &ResolverContext<'_>) -> Result<CompiledOutput, SassError> {
        let entry = IndexEntry::from_absolute(scope.pathname());
        let source = scope.index().read_string(&entry)?;
        self.compile(&source, scope)
    }
}

/// Compile `source` with a prepared options bundle.
pub fn render(source: &str, options: &CompilerOptions<'_>) -> Result<CompiledOutput, SassError> {
    let importer = AssetImporter::new(&options.custom.resolver);
    let load_paths: Vec<PathBuf> = options
        .import_paths
        .iter()
        .map(ImportPath::load_path)
        .collect();

    let grass_options = grass::Options::default()
        .fs(&importer)
        .load_paths(load_paths.as_slice())
        .style(options.style.into())
        .quiet(options.quiet)
        .input_syntax(options.syntax.input_syntax());

    tracing::debug!(
        file = %options.filename.display(),
        syntax = options.syntax.settings().syntax,
        "Compiling stylesheet"
    );

    match grass::from_string(source.to_string(), &grass_options) {
        Ok(css) => {
            let dependencies = importer.dependencies();
            tracing::debug!(
                file = %options.filename.display(),
                dependencies = dependencies.len(),
                "Compiled stylesheet"
            );
            Ok(CompiledOutput {
                css,
                css_filename: options.css_filename.clone(),
                dependencies,
            })
        }
        Err(e) => {
            let error = compiler_error(&e.to_string(), options, &importer);
            tracing::debug!(error = %error, "Stylesheet compilation failed");
            Err(SassError::Compilation(error))
        }
    }
}

/// Location line of a grass error, either `./stdin:3:7` or
/// `stdin 3:7  root stylesheet`.
static TRACE_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:\./)?(\S+?)[: ](\d+):(\d+)(?:[ \t]|$)").unwrap()
});

fn compiler_error(
    message: &str,
    options: &CompilerOptions<'_>,
    importer: &AssetImporter<'_>,
) -> CompilerError {
    // Frames naming a file the importer served point at that file; anything
    // else is the root stylesheet, which grass only knows by a placeholder name.
    let (file, line, column) = match parse_location(message) {
        Some((frame_file, line, column)) => match importer.backing_path(Path::new(frame_file)) {
            Some(file) => (file, Some(line), Some(column)),
            None => (
                options.filename.clone(),
                Some((line + options.line).saturating_sub(1)),
                Some(column),
            ),
        },
        None => (options.filename.clone(), None, None),
    };

    CompilerError {
        message: message.trim().to_string(),
        file,
        line,
        column,
        unresolved: related_failures(message, &importer.failures()),
    }
}

fn parse_location(message: &str) -> Option<(&str, usize, usize)> {
    let captures = TRACE_FRAME.captures(message)?;
    let file = captures.get(1)?.as_str();
    let line = captures.get(2)?.as_str().parse().ok()?;
    let column = captures.get(3)?.as_str().parse().ok()?;
    Some((file, line, column))
}

/// Failures whose import stem appears in the compiler message, one per stem.
///
/// When the message is about an import but names none of the stems, every
/// distinct failure is reported.
fn related_failures(message: &str, failures: &[ResolveError]) -> Vec<ResolveError> {
    let mut distinct: Vec<(String, &ResolveError)> = Vec::new();
    for failure in failures {
        let stem = import_stem(failure.reference());
        if !stem.is_empty() && !distinct.iter().any(|(seen, _)| *seen == stem) {
            distinct.push((stem, failure));
        }
    }

    let related: Vec<ResolveError> = distinct
        .iter()
        .filter(|(stem, _)| message.contains(stem.as_str()))
        .map(|(_, failure)| (*failure).clone())
        .collect();
    if !related.is_empty() || !message.to_ascii_lowercase().contains("import") {
        return related;
    }
    distinct
        .into_iter()
        .map(|(_, failure)| failure.clone())
        .collect()
}
