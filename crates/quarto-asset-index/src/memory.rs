/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-memory asset index.
 *
 * Files are keyed by normalized absolute virtual path. Directories are
 * created implicitly when files are added. An ordered list of roots acts as
 * the search path for logical references.
 */

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::mime::MimeRegistry;
use crate::traits::{AssetIndex, Candidates, IndexEntry, IndexError, IndexResult};

/// In-memory implementation of [`AssetIndex`].
///
/// Candidate enumeration order for a reference `name` within a search
/// directory is:
/// 1. `dir/name` itself, if it is a file
/// 2. siblings named `name.*`, sorted
/// 3. partials named `_name` or `_name.*`, sorted
/// 4. `dir/name/index` or `dir/name/index.*`, sorted
///
/// Search directories are the base path followed by the roots, unless the
/// reference is explicitly relative (`./` or `../`), in which case only the
/// base path is searched.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    registry: MimeRegistry,
    roots: Vec<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryIndex {
    /// Create an empty index with the default extension registry.
    pub fn new() -> Self {
        Self::with_registry(MimeRegistry::default())
    }

    /// Create an empty index with a custom extension registry.
    pub fn with_registry(registry: MimeRegistry) -> Self {
        let mut directories = BTreeSet::new();
        directories.insert(PathBuf::from("/"));
        Self {
            registry,
            roots: Vec::new(),
            files: BTreeMap::new(),
            directories,
        }
    }

    /// Create an index from the contents of a directory on disk.
    ///
    /// The directory becomes the first root of the index.
    pub fn from_directory(dir: &Path) -> IndexResult<Self> {
        let mut index = Self::new();
        index.load_directory(dir)?;
        Ok(index)
    }

    /// Load every file under `dir` and register the directory as a root.
    ///
    /// Files are keyed by their canonical path on disk.
    pub fn load_directory(&mut self, dir: &Path) -> IndexResult<()> {
        let root = std::fs::canonicalize(dir).map_err(|source| IndexError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut count = 0usize;
        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| IndexError::Scan {
                path: root.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let contents = std::fs::read(entry.path()).map_err(|source| IndexError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            self.add_file(entry.path(), contents);
            count += 1;
        }

        tracing::debug!(root = %root.display(), files = count, "Loaded asset directory");
        self.add_root(&root);
        Ok(())
    }

    /// Append a search root. Roots are searched in the order they were added.
    pub fn add_root(&mut self, root: &Path) {
        let normalized = normalize_path(root);
        self.add_directory_and_parents(&normalized);
        if !self.roots.contains(&normalized) {
            self.roots.push(normalized);
        }
    }

    /// Builder-style variant of [`MemoryIndex::add_root`].
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.add_root(root.as_ref());
        self
    }

    /// Builder-style variant of [`MemoryIndex::add_file`].
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path.as_ref(), contents);
        self
    }

    /// The search roots, in order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Add a file, creating all parent directories.
    pub fn add_file(&mut self, path: &Path, contents: impl Into<Vec<u8>>) {
        let normalized = normalize_path(path);
        if let Some(parent) = normalized.parent() {
            self.add_directory_and_parents(parent);
        }
        self.files.insert(normalized, contents.into());
    }

    /// Remove a file. Returns true if the file existed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        self.files.remove(&normalize_path(path)).is_some()
    }

    /// All file paths, in sorted order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn add_directory_and_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }

    /// Names of the files directly inside `dir`, sorted.
    fn file_names_in(&self, dir: &Path) -> Vec<String> {
        self.files
            .range(dir.to_path_buf()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(dir))
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    fn search_dirs(&self, reference: &Path, base_path: &Path) -> Vec<PathBuf> {
        if reference.is_absolute() {
            return vec![PathBuf::from("/")];
        }

        let mut dirs = vec![normalize_path(base_path)];
        let explicit_relative = matches!(
            reference.components().next(),
            Some(Component::CurDir | Component::ParentDir)
        );
        if !explicit_relative {
            for root in &self.roots {
                if !dirs.contains(root) {
                    dirs.push(root.clone());
                }
            }
        }
        dirs
    }

    fn candidates_in(&self, dir: &Path, reference: &Path) -> Vec<IndexEntry> {
        let target = normalize_path(&dir.join(reference));
        let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
            return Vec::new();
        };
        let name = name.to_string_lossy();

        let mut found = Vec::new();
        if self.files.contains_key(&target) {
            found.push(target.clone());
        }

        let siblings = self.file_names_in(parent);
        let dotted = format!("{}.", name);
        found.extend(
            siblings
                .iter()
                .filter(|sibling| sibling.starts_with(&dotted))
                .map(|sibling| parent.join(sibling)),
        );

        if !name.starts_with('_') {
            let partial = format!("_{}", name);
            let partial_dotted = format!("_{}.", name);
            found.extend(
                siblings
                    .iter()
                    .filter(|sibling| **sibling == partial || sibling.starts_with(&partial_dotted))
                    .map(|sibling| parent.join(sibling)),
            );
        }

        if self.directories.contains(&target) {
            found.extend(
                self.file_names_in(&target)
                    .iter()
                    .filter(|child| *child == "index" || child.starts_with("index."))
                    .map(|child| target.join(child)),
            );
        }

        found
            .into_iter()
            .map(|path| {
                let logical_path = self.logical_path_for(&path, dir);
                IndexEntry { path, logical_path }
            })
            .collect()
    }

    /// Logical path of a file: relative to the first root containing it,
    /// else relative to the search directory, else the full path.
    fn logical_path_for(&self, path: &Path, dir: &Path) -> String {
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .or_else(|| path.strip_prefix(dir).ok())
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(path_to_slash)
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    fn lookup(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            let normalized = normalize_path(path);
            return self.files.contains_key(&normalized).then_some(normalized);
        }
        self.roots
            .iter()
            .map(|root| normalize_path(&root.join(path)))
            .find(|candidate| self.files.contains_key(candidate))
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetIndex for MemoryIndex {
    fn registry(&self) -> &MimeRegistry {
        &self.registry
    }

    fn stat(&self, path: &Path) -> bool {
        self.lookup(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        if path.is_absolute() {
            return self.directories.contains(&normalize_path(path));
        }
        self.roots
            .iter()
            .any(|root| self.directories.contains(&normalize_path(&root.join(path))))
    }

    fn resolve_candidates<'a>(&'a self, reference: &Path, base_path: &Path) -> Candidates<'a> {
        let reference = reference.to_path_buf();
        let dirs = self.search_dirs(&reference, base_path);
        let mut seen = HashSet::new();
        Box::new(
            dirs.into_iter()
                .flat_map(move |dir| self.candidates_in(&dir, &reference))
                .filter(move |entry| seen.insert(entry.path.clone())),
        )
    }

    fn read_path(&self, path: &Path) -> IndexResult<Vec<u8>> {
        self.lookup(path)
            .and_then(|found| self.files.get(&found).cloned())
            .ok_or_else(|| IndexError::NotFound(path.to_path_buf()))
    }
}

/// Normalize a path to an absolute virtual path (remove `.` and resolve `..`).
///
/// Relative paths are taken relative to `/`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Can't go above root
                normalized.pop();
            }
            Component::CurDir | Component::RootDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ContentType;

    fn fixture() -> MemoryIndex {
        MemoryIndex::new()
            .with_root("/app/assets")
            .with_root("/vendor/assets")
            .with_file("/app/assets/styles/base.css", "a { color: red; }")
            .with_file("/app/assets/styles/_base.scss", "$x: 1;")
            .with_file("/app/assets/styles/application.css.scss", "")
            .with_file("/app/assets/styles/grid/index.scss", "")
            .with_file("/app/assets/images/logo.png", vec![0x89, 0x50])
            .with_file("/vendor/assets/styles/reset.css", "* {}")
    }

    fn paths(candidates: Candidates<'_>) -> Vec<String> {
        candidates
            .map(|entry| entry.path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("a/b")), PathBuf::from("/a/b"));
        assert_eq!(normalize_path(Path::new("/../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_candidate_order_siblings_before_partials() {
        let index = fixture();
        let found = paths(index.resolve_candidates(Path::new("styles/base"), Path::new("/app/assets")));
        assert_eq!(
            found,
            vec![
                "/app/assets/styles/base.css".to_string(),
                "/app/assets/styles/_base.scss".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidates_are_restartable() {
        let index = fixture();
        let first = paths(index.resolve_candidates(Path::new("styles/base"), Path::new("/app/assets")));
        let second = paths(index.resolve_candidates(Path::new("styles/base"), Path::new("/app/assets")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_candidates_search_roots_after_base() {
        let index = fixture();
        let found: Vec<IndexEntry> = index
            .resolve_candidates(Path::new("styles/reset"), Path::new("/app/assets/styles"))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/vendor/assets/styles/reset.css"));
        assert_eq!(found[0].logical_path, "styles/reset.css");
    }

    #[test]
    fn test_explicit_relative_reference_only_searches_base() {
        let index = fixture();
        let found = paths(index.resolve_candidates(Path::new("./reset"), Path::new("/app/assets/styles")));
        assert!(found.is_empty());

        let found = paths(index.resolve_candidates(Path::new("../images/logo"), Path::new("/app/assets/styles")));
        assert_eq!(found, vec!["/app/assets/images/logo.png".to_string()]);
    }

    #[test]
    fn test_index_file_candidates() {
        let index = fixture();
        let found: Vec<IndexEntry> = index
            .resolve_candidates(Path::new("styles/grid"), Path::new("/app/assets"))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].logical_path, "styles/grid/index.scss");
    }

    #[test]
    fn test_exact_match_comes_first() {
        let index = fixture();
        let found = paths(index.resolve_candidates(Path::new("styles/base.css"), Path::new("/app/assets")));
        assert_eq!(found, vec!["/app/assets/styles/base.css".to_string()]);
    }

    #[test]
    fn test_stat_absolute_and_relative() {
        let index = fixture();
        assert!(index.stat(Path::new("/app/assets/images/logo.png")));
        assert!(index.stat(Path::new("images/logo.png")));
        assert!(index.stat(Path::new("styles/reset.css")));
        assert!(!index.stat(Path::new("/app/assets/images")));
        assert!(index.is_dir(Path::new("/app/assets/images")));
        assert!(index.is_dir(Path::new("styles")));
    }

    #[test]
    fn test_read_and_content_type() {
        let index = fixture();
        let entry = index
            .resolve_candidates(Path::new("styles/base"), Path::new("/app/assets"))
            .next()
            .unwrap();
        assert_eq!(index.read_string(&entry).unwrap(), "a { color: red; }");
        assert_eq!(index.content_type_of(&entry), ContentType::CSS);

        let err = index.read_path(Path::new("/nope.css")).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[test]
    fn test_remove_file() {
        let mut index = fixture();
        assert!(index.remove_file(Path::new("/app/assets/styles/base.css")));
        assert!(!index.remove_file(Path::new("/app/assets/styles/base.css")));
        let found = paths(index.resolve_candidates(Path::new("styles/base"), Path::new("/app/assets")));
        assert_eq!(found, vec!["/app/assets/styles/_base.scss".to_string()]);
    }
}
