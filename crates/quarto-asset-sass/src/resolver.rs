//! Asset reference resolution against a virtual index.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A reference is either an absolute path or a logical path relative to the
//! file being compiled. Resolution runs in two phases:
//!
//! 1. Absolute references that exist in the index resolve immediately, with
//!    no content-type check.
//! 2. Everything else is resolved by enumerating the index's candidates for
//!    the reference and taking the first whose content type matches the
//!    expected one. A reference whose own format extension contradicts the
//!    expected type fails before the index is consulted.

use std::path::{Path, PathBuf};

use quarto_asset_index::{Candidates, ContentType, IndexEntry, normalize_path};

use crate::context::ResolverContext;
use crate::error::ResolveError;

/// The content type a caller expects a reference to resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentTypeHint {
    /// Whatever the current compilation produces.
    #[default]
    Inherit,
    /// A specific content type.
    Explicit(ContentType),
    /// No constraint; the first candidate wins.
    Any,
}

impl From<ContentType> for ContentTypeHint {
    fn from(content_type: ContentType) -> Self {
        ContentTypeHint::Explicit(content_type)
    }
}

/// Resolves asset references for a single compilation.
///
/// Created per compile and bound to an immutable [`ResolverContext`]; holds
/// no other state, so resolving the same reference twice against an
/// unchanged index gives the same answer.
#[derive(Debug, Clone)]
pub struct AssetResolver<'a> {
    context: ResolverContext<'a>,
}

impl<'a> AssetResolver<'a> {
    pub fn new(context: ResolverContext<'a>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ResolverContext<'a> {
        &self.context
    }

    /// Resolve a reference, returning `None` when it cannot be found or has
    /// the wrong content type.
    pub fn resolve(&self, reference: &str, hint: ContentTypeHint) -> Option<IndexEntry> {
        match self.resolve_or_fail(reference, hint) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(reference, error = %e, "Asset probe failed");
                None
            }
        }
    }

    /// Resolve a reference, reporting why it failed.
    pub fn resolve_or_fail(
        &self,
        reference: &str,
        hint: ContentTypeHint,
    ) -> Result<IndexEntry, ResolveError> {
        self.resolve_matching(reference, hint)?
            .next()
            .ok_or_else(|| ResolveError::NotFound {
                reference: reference.to_string(),
            })
    }

    /// Every entry a reference may resolve to, best first.
    ///
    /// Applies the same absolute shortcut and extension check as
    /// [`resolve_or_fail`](Self::resolve_or_fail); an empty stream means the
    /// reference was not found.
    pub fn resolve_matching(
        &self,
        reference: &str,
        hint: ContentTypeHint,
    ) -> Result<Candidates<'a>, ResolveError> {
        let index = self.context.index();
        let path = Path::new(reference);

        if path.is_absolute() && index.stat(path) {
            let entry = IndexEntry::from_absolute(&normalize_path(path));
            return Ok(Box::new(std::iter::once(entry)));
        }

        let base_path = self.context.base_path();
        let expected = match hint {
            ContentTypeHint::Inherit => self.context.content_type().clone(),
            ContentTypeHint::Explicit(content_type) => content_type,
            ContentTypeHint::Any => return Ok(index.resolve_candidates(path, base_path)),
        };

        let attributes = index.attributes_for(path);
        if attributes.format_extension.is_some() {
            if let Some(actual) = attributes.content_type {
                if actual != expected {
                    return Err(ResolveError::ContentTypeMismatch {
                        reference: reference.to_string(),
                        actual,
                        expected,
                    });
                }
            }
        }

        Ok(Box::new(
            index
                .resolve_candidates(path, base_path)
                .filter(move |candidate| index.content_type_of(candidate) == expected),
        ))
    }

    /// Resolve a reference with no type constraint and return its text.
    pub fn process(&self, reference: &str) -> Option<String> {
        let entry = self.resolve(reference, ContentTypeHint::Any)?;
        self.context.index().read_string(&entry).ok()
    }

    /// Physical output path of a logical path with extension `ext`.
    pub fn source_path(&self, path: &str, ext: &str) -> PathBuf {
        self.context
            .paths()
            .compute_source_path(path, &self.context.config().prefix, ext)
    }

    /// Public URL of an asset under the configured prefix.
    pub fn public_path(&self, path: &str) -> String {
        self.context
            .paths()
            .compute_public_path(path, &self.context.config().prefix, None)
    }

    pub fn image_path(&self, image: &str) -> String {
        self.context.image_path(image)
    }

    pub fn video_path(&self, video: &str) -> String {
        self.context.video_path(video)
    }

    pub fn audio_path(&self, audio: &str) -> String {
        self.context.audio_path(audio)
    }

    pub fn javascript_path(&self, javascript: &str) -> String {
        self.context.javascript_path(javascript)
    }

    pub fn stylesheet_path(&self, stylesheet: &str) -> String {
        self.context.stylesheet_path(stylesheet)
    }

    pub fn font_path(&self, font: &str) -> String {
        self.context.font_path(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SassConfig;
    use crate::paths::StaticPathHelpers;
    use quarto_asset_index::MemoryIndex;

    fn index() -> MemoryIndex {
        MemoryIndex::new()
            .with_root("/app/assets")
            .with_file("/app/assets/styles/application.scss", "")
            .with_file("/app/assets/styles/_forms.scss", ".form {}")
            .with_file("/app/assets/javascripts/forms.js", "")
            .with_file("/app/assets/images/logo.png", vec![1u8, 2, 3])
    }

    fn with_resolver<T>(f: impl FnOnce(&AssetResolver<'_>) -> T) -> T {
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
        f(&AssetResolver::new(context))
    }

    #[test]
    fn test_inherit_uses_context_content_type() {
        with_resolver(|resolver| {
            let entry = resolver
                .resolve_or_fail("forms", ContentTypeHint::Inherit)
                .unwrap();
            assert_eq!(entry.path, PathBuf::from("/app/assets/styles/_forms.scss"));
        });
    }

    #[test]
    fn test_explicit_type_filters_candidates() {
        with_resolver(|resolver| {
            let entry = resolver
                .resolve_or_fail("javascripts/forms", ContentTypeHint::Explicit(ContentType::JAVASCRIPT))
                .unwrap();
            assert_eq!(entry.logical_path, "javascripts/forms.js");

            let err = resolver
                .resolve_or_fail("javascripts/forms", ContentTypeHint::Explicit(ContentType::CSS))
                .unwrap_err();
            assert_eq!(
                err,
                ResolveError::NotFound {
                    reference: "javascripts/forms".to_string()
                }
            );
        });
    }

    #[test]
    fn test_any_takes_first_candidate() {
        with_resolver(|resolver| {
            let entry = resolver.resolve("images/logo", ContentTypeHint::Any).unwrap();
            assert_eq!(entry.logical_path, "images/logo.png");
        });
    }

    #[test]
    fn test_mismatch_message() {
        with_resolver(|resolver| {
            let err = resolver
                .resolve_or_fail("images/logo.png", ContentTypeHint::Inherit)
                .unwrap_err();
            assert_eq!(err.to_string(), "images/logo.png is 'image/png', not 'text/css'");
        });
    }

    #[test]
    fn test_process_reads_content() {
        with_resolver(|resolver| {
            assert_eq!(resolver.process("forms").as_deref(), Some(".form {}"));
            assert_eq!(resolver.process("missing"), None);
        });
    }

    #[test]
    fn test_path_helpers() {
        with_resolver(|resolver| {
            assert_eq!(
                resolver.source_path("styles/application", "css"),
                PathBuf::from("public/assets/styles/application.css")
            );
            assert_eq!(resolver.public_path("styles/application.css"), "/assets/styles/application.css");
            assert_eq!(resolver.image_path("logo.png"), "/assets/logo.png");
            assert_eq!(resolver.javascript_path("forms"), "/assets/forms.js");
            assert_eq!(resolver.stylesheet_path("forms"), "/assets/forms.css");
            assert_eq!(resolver.font_path("icons.woff"), "/assets/icons.woff");
            assert_eq!(resolver.video_path("intro.mp4"), "/assets/intro.mp4");
            assert_eq!(resolver.audio_path("ding.mp3"), "/assets/ding.mp3");
        });
    }
}
