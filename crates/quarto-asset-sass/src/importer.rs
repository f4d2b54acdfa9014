//! Import resolution hook for grass.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! `AssetImporter` implements `grass::Fs`, so every file grass probes while
//! evaluating `@import`/`@use` goes through it:
//!
//! - Probes under [`IMPORTER_ROOT`] (the first load path) and relative probes
//!   from the root stylesheet are logical references, resolved strictly
//!   through the [`AssetResolver`]
//! - Absolute probes (global load paths) are looked up in the index directly
//!
//! Successful resolutions are remembered so that `read` serves the backing
//! entry. Failed resolutions are kept so a compiler error can say why an
//! import was not found.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use quarto_asset_index::{IndexEntry, normalize_path};

use crate::error::ResolveError;
use crate::resolver::{AssetResolver, ContentTypeHint};

/// Virtual load path under which grass reaches the asset importer.
pub const IMPORTER_ROOT: &str = "/__asset_importer__";

/// How a path probed by grass is interpreted.
enum Probe<'p> {
    /// The importer root directory itself.
    Root,
    /// A logical reference to resolve through the resolver.
    Reference(String),
    /// An absolute path to look up in the index as-is.
    Absolute(&'p Path),
}

#[derive(Debug, Default)]
struct ImportState {
    resolved: HashMap<PathBuf, IndexEntry>,
    failures: Vec<ResolveError>,
    dependencies: Vec<PathBuf>,
}

/// Adapter that implements `grass::Fs` on top of an [`AssetResolver`].
pub struct AssetImporter<'a> {
    resolver: &'a AssetResolver<'a>,
    state: Mutex<ImportState>,
}

impl<'a> AssetImporter<'a> {
    pub fn new(resolver: &'a AssetResolver<'a>) -> Self {
        Self {
            resolver,
            state: Mutex::new(ImportState::default()),
        }
    }

    /// Backing files that grass read during compilation, in read order.
    pub fn dependencies(&self) -> Vec<PathBuf> {
        self.state().dependencies.clone()
    }

    /// Resolution failures recorded while probing, in probe order.
    pub fn failures(&self) -> Vec<ResolveError> {
        self.state().failures.clone()
    }

    /// The index path backing a probed path, if the probe resolved.
    pub fn backing_path(&self, probe: &Path) -> Option<PathBuf> {
        match classify(probe) {
            Probe::Reference(_) => self
                .state()
                .resolved
                .get(probe)
                .map(|entry| entry.path.clone()),
            Probe::Absolute(path) => self
                .resolver
                .context()
                .index()
                .stat(path)
                .then(|| normalize_path(path)),
            Probe::Root => None,
        }
    }

    fn state(&self) -> MutexGuard<'_, ImportState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, probe: &Path, reference: &str) -> Option<IndexEntry> {
        if let Some(entry) = self.state().resolved.get(probe) {
            return Some(entry.clone());
        }

        // grass attaches a dialect extension to every probe, so `theme.scss`
        // must also reach `_theme.css.scss` through the stem `theme`.
        let extension = probe.extension();
        let target = match extension.and_then(|ext| ext.to_str()) {
            Some("scss" | "sass") => strip_extension(reference),
            _ => reference,
        };

        let found = self
            .resolver
            .resolve_matching(target, ContentTypeHint::Inherit)
            .map(|mut candidates| {
                candidates.find(|entry| {
                    extension.is_none_or(|ext| entry.path.extension() == Some(ext))
                })
            });

        match found {
            Ok(Some(entry)) => {
                tracing::trace!(probe = %probe.display(), entry = %entry.path.display(), "Import resolved");
                self.state()
                    .resolved
                    .insert(probe.to_path_buf(), entry.clone());
                Some(entry)
            }
            Ok(None) => {
                tracing::trace!(probe = %probe.display(), "Import probe found no entry with its syntax");
                self.record_failure(ResolveError::NotFound {
                    reference: reference.to_string(),
                });
                None
            }
            Err(e) => {
                tracing::trace!(probe = %probe.display(), error = %e, "Import probe failed");
                self.record_failure(e);
                None
            }
        }
    }

    fn record_failure(&self, failure: ResolveError) {
        let mut state = self.state();
        if !state.failures.contains(&failure) {
            state.failures.push(failure);
        }
    }

    /// Whether a logical reference names a directory, searched like a file
    /// reference: the base directory first, then the roots unless the
    /// reference is explicitly relative.
    fn is_reference_dir(&self, reference: &str) -> bool {
        let context = self.resolver.context();
        let index = context.index();
        let path = Path::new(reference);
        if index.is_dir(&context.base_path().join(path)) {
            return true;
        }
        let explicit_relative = matches!(
            path.components().next(),
            Some(Component::CurDir | Component::ParentDir)
        );
        !explicit_relative && index.is_dir(path)
    }

    fn record_dependency(&self, path: &Path) {
        let mut state = self.state();
        if !state.dependencies.iter().any(|p| p == path) {
            state.dependencies.push(path.to_path_buf());
        }
    }
}

impl Debug for AssetImporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetImporter")
            .field("resolver", self.resolver.context())
            .finish()
    }
}

impl grass::Fs for AssetImporter<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        let index = self.resolver.context().index();
        match classify(path) {
            Probe::Root => true,
            Probe::Reference(reference) => self.is_reference_dir(&reference),
            Probe::Absolute(path) => index.is_dir(path),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        match classify(path) {
            Probe::Root => false,
            Probe::Reference(reference) => self.lookup(path, &reference).is_some(),
            Probe::Absolute(path) => self.resolver.context().index().stat(path),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let index = self.resolver.context().index();
        let entry_path = match classify(path) {
            Probe::Root => None,
            Probe::Reference(reference) => self.lookup(path, &reference).map(|entry| entry.path),
            Probe::Absolute(path) => Some(normalize_path(path)),
        };
        let Some(entry_path) = entry_path else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("couldn't find file '{}'", path.display()),
            ));
        };

        let contents = index.read_path(&entry_path).map_err(io::Error::other)?;
        self.record_dependency(&entry_path);
        Ok(contents)
    }
}

fn classify(path: &Path) -> Probe<'_> {
    if let Ok(rest) = path.strip_prefix(IMPORTER_ROOT) {
        if rest.as_os_str().is_empty() {
            return Probe::Root;
        }
        return Probe::Reference(to_reference(rest));
    }
    if path.is_relative() {
        return Probe::Reference(to_reference(path));
    }
    Probe::Absolute(path)
}

/// Slash-joined reference for a probed path. Inner `.` components are
/// dropped; a leading one is kept so the reference stays explicitly relative.
fn to_reference(path: &Path) -> String {
    path.components()
        .enumerate()
        .filter(|(i, component)| *i == 0 || !matches!(component, Component::CurDir))
        .map(|(_, component)| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `styles/theme.scss` becomes `styles/theme`.
fn strip_extension(reference: &str) -> &str {
    match reference.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem,
        _ => reference,
    }
}

/// The part of a probed reference that appears in the `@import` statement:
/// `styles/_forms.scss` and `styles/forms/_index.scss` both become `styles/forms`.
pub(crate) fn import_stem(reference: &str) -> String {
    let mut path = PathBuf::from(reference);
    while let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        if !matches!(ext, "scss" | "sass" | "css" | "import") {
            break;
        }
        path.set_extension("");
    }
    if matches!(
        path.file_name().and_then(|name| name.to_str()),
        Some("index" | "_index")
    ) {
        path.pop();
    }
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
        let trimmed = name.trim_start_matches('_').to_string();
        path.set_file_name(trimmed);
    }
    to_reference(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SassConfig;
    use crate::context::ResolverContext;
    use crate::paths::StaticPathHelpers;
    use grass::Fs;
    use quarto_asset_index::MemoryIndex;

    fn index() -> MemoryIndex {
        MemoryIndex::new()
            .with_root("/app/assets")
            .with_root("/vendor/stylesheets")
            .with_file("/app/assets/styles/_forms.scss", ".form { margin: 0; }")
            .with_file("/app/assets/styles/theme.css.scss", "$x: 1;")
            .with_file("/app/assets/styles/_print.css.sass", "$y: 2")
            .with_file("/app/assets/styles/components/_index.scss", ".c {}")
            .with_file("/vendor/stylesheets/_reset.scss", "* { margin: 0; }")
    }

    fn with_importer<T>(f: impl FnOnce(&AssetImporter<'_>) -> T) -> T {
        let index = index();
        let paths = StaticPathHelpers::new("public");
        let config = SassConfig::default();
        let context = ResolverContext::new(
            &index,
            &paths,
            &config,
            "/app/assets/styles/application.scss",
            "styles/application",
        );
        let resolver = AssetResolver::new(context);
        let importer = AssetImporter::new(&resolver);
        f(&importer)
    }

    #[test]
    fn test_importer_root_is_a_directory() {
        with_importer(|importer| {
            assert!(importer.is_dir(Path::new(IMPORTER_ROOT)));
            assert!(!importer.is_file(Path::new(IMPORTER_ROOT)));
            assert!(importer.is_dir(Path::new("/vendor/stylesheets")));
        });
    }

    #[test]
    fn test_probe_under_root_resolves_partial() {
        with_importer(|importer| {
            let probe = Path::new("/__asset_importer__/styles/forms.scss");
            assert!(importer.is_file(probe));
            assert_eq!(
                importer.read(probe).unwrap(),
                b".form { margin: 0; }".to_vec()
            );
            assert_eq!(
                importer.backing_path(probe),
                Some(PathBuf::from("/app/assets/styles/_forms.scss"))
            );
            assert_eq!(
                importer.dependencies(),
                vec![PathBuf::from("/app/assets/styles/_forms.scss")]
            );
        });
    }

    #[test]
    fn test_relative_probe_resolves_against_base() {
        with_importer(|importer| {
            assert!(importer.is_file(Path::new("forms.scss")));
        });
    }

    #[test]
    fn test_absolute_probe_uses_index() {
        with_importer(|importer| {
            assert!(importer.is_file(Path::new("/vendor/stylesheets/_reset.scss")));
            assert!(!importer.is_file(Path::new("/vendor/stylesheets/reset.scss")));
            // Absolute misses are global search-path misses, not resolution failures
            assert!(importer.failures().is_empty());

            importer
                .read(Path::new("/vendor/stylesheets/../stylesheets/_reset.scss"))
                .unwrap();
            assert_eq!(
                importer.dependencies(),
                vec![PathBuf::from("/vendor/stylesheets/_reset.scss")]
            );
        });
    }

    #[test]
    fn test_dialect_probe_reaches_format_prefixed_entry() {
        with_importer(|importer| {
            let probe = Path::new("/__asset_importer__/styles/theme.scss");
            assert!(importer.is_file(probe));
            assert_eq!(
                importer.backing_path(probe),
                Some(PathBuf::from("/app/assets/styles/theme.css.scss"))
            );

            // Relative partial probe for `@import "print"` in the indented dialect
            assert!(importer.is_file(Path::new("_print.sass")));
            assert!(!importer.is_file(Path::new("_print.scss")));
        });
    }

    #[test]
    fn test_css_probe_does_not_serve_scss_entry() {
        with_importer(|importer| {
            // theme.css.scss is SCSS; grass parses a `.css` probe as plain CSS
            assert!(!importer.is_file(Path::new("/__asset_importer__/styles/theme.css")));
        });
    }

    #[test]
    fn test_reference_directories_search_base_first() {
        with_importer(|importer| {
            assert!(importer.is_dir(Path::new("components")));
            assert!(importer.is_dir(Path::new("./components")));
            assert!(importer.is_dir(Path::new("/__asset_importer__/components")));
            assert!(importer.is_file(Path::new("components/_index.scss")));

            // Found under a root, but explicitly relative references stay in the base
            assert!(importer.is_dir(Path::new("styles")));
            assert!(!importer.is_dir(Path::new("./styles")));
        });
    }

    #[test]
    fn test_failures_are_recorded_once() {
        with_importer(|importer| {
            assert!(!importer.is_file(Path::new("missing.scss")));
            assert!(!importer.is_file(Path::new("/__asset_importer__/missing.scss")));
            assert_eq!(
                importer.failures(),
                vec![ResolveError::NotFound {
                    reference: "missing.scss".to_string()
                }]
            );
        });
    }

    #[test]
    fn test_read_unresolved_probe_is_not_found() {
        with_importer(|importer| {
            let err = importer.read(Path::new("nope.scss")).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        });
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("styles/theme.scss"), "styles/theme");
        assert_eq!(strip_extension("./theme.sass"), "./theme");
        assert_eq!(strip_extension("./theme"), "./theme");
        assert_eq!(strip_extension("v1.2/theme"), "v1.2/theme");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_to_reference_keeps_leading_current_dir() {
        assert_eq!(to_reference(Path::new("./a/./b.scss")), "./a/b.scss");
        assert_eq!(to_reference(Path::new("a/b.scss")), "a/b.scss");
    }

    #[test]
    fn test_import_stem() {
        assert_eq!(import_stem("styles/_forms.scss"), "styles/forms");
        assert_eq!(import_stem("styles/forms.import.scss"), "styles/forms");
        assert_eq!(import_stem("styles/forms/_index.scss"), "styles/forms");
        assert_eq!(import_stem("missing.sass"), "missing");
        assert_eq!(import_stem("jquery.ui"), "jquery.ui");
    }
}
