//! File cataloging of a staged repository tree
//!
//! The walk is depth-first with each directory's children visited in byte-wise
//! lexical order of their names, so the same tree always yields the same
//! sequence. Symlinks are only followed when they resolve to a regular file
//! inside the root; everything else is left out of the catalog.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use explainer_core::constants::SNIFF_BYTES;
use explainer_core::models::{ContentCategory, FileEntry};
use explainer_storage::normalize_relative_path;
use tokio_util::sync::CancellationToken;
use walkdir::{DirEntry, WalkDir};

use crate::classify::{category_from_name, extension_of, mime_type, sniff};
use crate::error::{IngestError, IngestResult};

const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Result of cataloging a tree.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<FileEntry>,
    pub total_bytes: u64,
    pub language_stats: BTreeMap<String, usize>,
    /// Paths left out of the catalog (escaping or dangling links, unusable names).
    pub omitted: Vec<String>,
}

impl Catalog {
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, entry: FileEntry) {
        self.total_bytes += entry.size;
        *self
            .language_stats
            .entry(entry.extension.clone().unwrap_or_default())
            .or_insert(0) += 1;
        self.entries.push(entry);
    }
}

/// Catalog every file under `root`.
///
/// Blocking; run it on a blocking thread. Checks `cancel` between entries.
pub fn catalog_tree(root: &Path, cancel: &CancellationToken) -> IngestResult<Catalog> {
    let root = root.canonicalize()?;
    let mut catalog = Catalog::default();

    let mut walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_dir(e));

    while let Some(item) = walker.next() {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        let entry = item.map_err(std::io::Error::from)?;
        let file_type = entry.file_type();

        let Some(rel) = relative_name(&root, entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "Skipping file with unusable name");
            catalog
                .omitted
                .push(entry.file_name().to_string_lossy().into_owned());
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        };

        if file_type.is_dir() {
            continue;
        }

        if file_type.is_file() {
            let size = entry.metadata().map_err(std::io::Error::from)?.len();
            catalog.push(describe(entry.path(), rel, size));
        } else if file_type.is_symlink() {
            match resolve_inside(&root, entry.path()) {
                Some(target) if target.is_file() => {
                    let size = fs::metadata(&target)?.len();
                    catalog.push(describe(&target, rel, size));
                }
                Some(_) => {
                    tracing::debug!(path = %rel, "Not following directory symlink");
                }
                None => {
                    tracing::warn!(path = %rel, "Omitting symlink that escapes the repository root");
                    catalog.omitted.push(rel);
                }
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        file_count = catalog.file_count(),
        total_bytes = catalog.total_bytes,
        omitted = catalog.omitted.len(),
        "Catalog built"
    );

    Ok(catalog)
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| VCS_DIRS.contains(&name))
}

/// `/`-joined path of `path` under `root`, if every component is valid UTF-8
/// and the result is already in normalized form.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    let joined = parts.join("/");
    (normalize_relative_path(&joined).ok().as_deref() == Some(joined.as_str())).then_some(joined)
}

/// Canonical target of `link` when it exists and stays under `root`.
fn resolve_inside(root: &Path, link: &Path) -> Option<PathBuf> {
    let target = fs::canonicalize(link).ok()?;
    target.starts_with(root).then_some(target)
}

fn describe(content_path: &Path, rel: String, size: u64) -> FileEntry {
    let content_type = category_from_name(&rel).unwrap_or_else(|| sniff_file(content_path));
    FileEntry {
        mime_type: mime_type(&rel, content_type),
        extension: extension_of(&rel),
        content_type,
        size,
        path: rel,
    }
}

fn sniff_file(path: &Path) -> ContentCategory {
    let mut head = Vec::with_capacity(SNIFF_BYTES);
    match fs::File::open(path).and_then(|f| f.take(SNIFF_BYTES as u64).read_to_end(&mut head)) {
        Ok(_) => sniff(&head),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not sniff file content");
            ContentCategory::Binary
        }
    }
}

/// Replace cataloged symlinks with copies of their targets so the published
/// tree holds only regular files.
pub fn materialize_links(root: &Path, entries: &[FileEntry]) -> IngestResult<()> {
    let root = root.canonicalize()?;
    for entry in entries {
        let path = root.join(&entry.path);
        if !fs::symlink_metadata(&path)?.file_type().is_symlink() {
            continue;
        }
        let target = resolve_inside(&root, &path).ok_or_else(|| {
            IngestError::PathRejected(format!("{} resolves outside the repository", entry.path))
        })?;
        fs::remove_file(&path)?;
        fs::copy(&target, &path)?;
    }
    Ok(())
}
