/*
 * mime.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Content types and the extension registry used to classify asset paths.
 *
 * Extensions come in two flavors:
 * - Format extensions name the content type of the file (`.css`, `.png`)
 * - Engine extensions name a processing step and are stripped when looking
 *   for the format (`.scss`, `.erb`); some imply a default content type
 *
 * So `app.css.scss` has format extension `.css` and engine `.scss`, while
 * `_base.scss` has no format extension but is still `text/css` through the
 * engine default.
 */

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A MIME-like content type tag, e.g. `text/css`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    pub const CSS: ContentType = ContentType::from_static("text/css");
    pub const JAVASCRIPT: ContentType = ContentType::from_static("application/javascript");
    pub const OCTET_STREAM: ContentType = ContentType::from_static("application/octet-stream");

    /// Create a content type from a static string.
    pub const fn from_static(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    /// Create a content type from an owned string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(value: &str) -> Self {
        ContentType::new(value)
    }
}

/// What a path's extensions say about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAttributes {
    /// The registered format extension, including the leading dot.
    pub format_extension: Option<String>,
    /// Engine extensions, outermost first (`a.css.scss.erb` -> `[".erb", ".scss"]`).
    pub engine_extensions: Vec<String>,
    /// Content type implied by the extensions, if any.
    pub content_type: Option<ContentType>,
}

/// Registry mapping file extensions to content types.
#[derive(Debug, Clone)]
pub struct MimeRegistry {
    formats: HashMap<String, ContentType>,
    engines: HashMap<String, Option<ContentType>>,
}

impl MimeRegistry {
    /// An empty registry with no known extensions.
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
            engines: HashMap::new(),
        }
    }

    /// Register a format extension (with or without the leading dot).
    pub fn register_format(&mut self, extension: &str, content_type: ContentType) {
        self.formats.insert(normalize_extension(extension), content_type);
    }

    /// Register an engine extension with an optional default content type.
    pub fn register_engine(&mut self, extension: &str, default_type: Option<ContentType>) {
        self.engines.insert(normalize_extension(extension), default_type);
    }

    /// Content type registered for a format extension.
    pub fn format_type(&self, extension: &str) -> Option<&ContentType> {
        self.formats.get(&normalize_extension(extension))
    }

    pub fn is_engine(&self, extension: &str) -> bool {
        self.engines.contains_key(&normalize_extension(extension))
    }

    /// Classify a path by its extensions.
    ///
    /// Extensions are walked right-to-left. Engine extensions are collected
    /// until the first non-engine extension, which is the format extension
    /// when it is registered.
    pub fn attributes_for(&self, path: &Path) -> PathAttributes {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return PathAttributes::default();
        };
        // Leading dots belong to the name (".hidden"), not to an extension
        let trimmed = file_name.trim_start_matches('.');
        let mut parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() < 2 {
            return PathAttributes::default();
        }
        parts.remove(0);

        let mut attributes = PathAttributes::default();
        let mut engine_default: Option<ContentType> = None;

        for ext in parts.iter().rev() {
            let ext = normalize_extension(ext);
            if let Some(default_type) = self.engines.get(&ext) {
                attributes.engine_extensions.push(format!(".{}", ext));
                if default_type.is_some() {
                    engine_default = default_type.clone();
                }
                continue;
            }
            if let Some(content_type) = self.formats.get(&ext) {
                attributes.format_extension = Some(format!(".{}", ext));
                attributes.content_type = Some(content_type.clone());
            }
            break;
        }

        if attributes.content_type.is_none() {
            attributes.content_type = engine_default;
        }
        attributes
    }

    /// The content type of a concrete file, defaulting to `application/octet-stream`.
    pub fn content_type_of(&self, path: &Path) -> ContentType {
        self.attributes_for(path)
            .content_type
            .unwrap_or(ContentType::OCTET_STREAM)
    }
}

impl Default for MimeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let formats: &[(&str, &'static str)] = &[
            ("css", "text/css"),
            ("js", "application/javascript"),
            ("json", "application/json"),
            ("html", "text/html"),
            ("txt", "text/plain"),
            ("xml", "application/xml"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
            ("svg", "image/svg+xml"),
            ("ico", "image/vnd.microsoft.icon"),
            ("webp", "image/webp"),
            ("woff", "font/woff"),
            ("woff2", "font/woff2"),
            ("ttf", "font/ttf"),
            ("otf", "font/otf"),
            ("eot", "application/vnd.ms-fontobject"),
            ("mp4", "video/mp4"),
            ("webm", "video/webm"),
            ("ogv", "video/ogg"),
            ("mp3", "audio/mpeg"),
            ("ogg", "audio/ogg"),
            ("wav", "audio/wav"),
        ];
        for (ext, content_type) in formats {
            registry.register_format(ext, ContentType::from_static(content_type));
        }
        registry.register_engine("scss", Some(ContentType::CSS));
        registry.register_engine("sass", Some(ContentType::CSS));
        registry.register_engine("coffee", Some(ContentType::JAVASCRIPT));
        registry.register_engine("erb", None);
        registry
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extension() {
        let registry = MimeRegistry::default();
        let attrs = registry.attributes_for(Path::new("images/logo.png"));
        assert_eq!(attrs.format_extension.as_deref(), Some(".png"));
        assert_eq!(attrs.content_type, Some(ContentType::from_static("image/png")));
        assert!(attrs.engine_extensions.is_empty());
    }

    #[test]
    fn test_engine_only_extension_has_no_format() {
        let registry = MimeRegistry::default();
        let attrs = registry.attributes_for(Path::new("styles/_base.scss"));
        assert_eq!(attrs.format_extension, None);
        assert_eq!(attrs.engine_extensions, vec![".scss".to_string()]);
        assert_eq!(attrs.content_type, Some(ContentType::CSS));
    }

    #[test]
    fn test_format_behind_engines() {
        let registry = MimeRegistry::default();
        let attrs = registry.attributes_for(Path::new("app.css.scss.erb"));
        assert_eq!(attrs.format_extension.as_deref(), Some(".css"));
        assert_eq!(
            attrs.engine_extensions,
            vec![".erb".to_string(), ".scss".to_string()]
        );
        assert_eq!(attrs.content_type, Some(ContentType::CSS));
    }

    #[test]
    fn test_no_extension() {
        let registry = MimeRegistry::default();
        assert_eq!(
            registry.attributes_for(Path::new("styles/base")),
            PathAttributes::default()
        );
        assert_eq!(
            registry.attributes_for(Path::new(".hidden")),
            PathAttributes::default()
        );
    }

    #[test]
    fn test_unknown_extension_is_not_a_format() {
        let registry = MimeRegistry::default();
        let attrs = registry.attributes_for(Path::new("jquery.min.unknown"));
        assert_eq!(attrs.format_extension, None);
        assert_eq!(attrs.content_type, None);
        assert_eq!(
            registry.content_type_of(Path::new("jquery.min.unknown")),
            ContentType::OCTET_STREAM
        );
    }

    #[test]
    fn test_dotted_name_stops_at_first_non_engine() {
        // "jquery.min.js": the ".min" part never becomes a format
        let registry = MimeRegistry::default();
        let attrs = registry.attributes_for(Path::new("jquery.min.js"));
        assert_eq!(attrs.format_extension.as_deref(), Some(".js"));
        assert_eq!(attrs.content_type, Some(ContentType::JAVASCRIPT));
    }

    #[test]
    fn test_register_custom_types() {
        let mut registry = MimeRegistry::empty();
        registry.register_format(".hbs", ContentType::new("text/x-handlebars"));
        registry.register_engine("tmpl", None);
        let attrs = registry.attributes_for(Path::new("card.hbs.tmpl"));
        assert_eq!(attrs.format_extension.as_deref(), Some(".hbs"));
        assert_eq!(attrs.content_type.unwrap().as_str(), "text/x-handlebars");
        assert!(registry.is_engine("TMPL"));
    }
}
