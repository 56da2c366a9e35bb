//! Local filesystem snapshot store
//!
//! Each publish writes a fresh generation directory and then swaps the
//! repository's `CURRENT` pointer with a rename, so a reader never observes a
//! half-written snapshot. Catalogs are also cached in memory as `Arc<Snapshot>`;
//! a reader holding one keeps a consistent view even while a newer generation is
//! published or the repository is deleted.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use explainer_core::models::{CatalogDocument, FileEntry, Snapshot};
use explainer_core::validation::validate_repository_id;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::paths::normalize_relative_path;
use crate::traits::{SnapshotStore, StorageError, StorageResult};

const CURRENT_POINTER: &str = "CURRENT";
const CATALOG_FILE: &str = "catalog.json";
const FILES_DIR: &str = "files";
const TRASH_PREFIX: &str = ".trash-";

pub struct LocalSnapshotStore {
    root: PathBuf,
    snapshots: RwLock<HashMap<String, Arc<Snapshot>>>,
    // Serializes publish and delete; reads never take it.
    write_lock: Mutex<()>,
}

impl LocalSnapshotStore {
    /// Open (or create) a store rooted at `root` and load every published snapshot.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create snapshot directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize snapshot root: {}", e))
        })?;

        let store = LocalSnapshotStore {
            root,
            snapshots: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        };
        store.load_existing().await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_dir(&self, repository_id: &str) -> PathBuf {
        self.root.join(repository_id)
    }

    fn check_id(repository_id: &str) -> StorageResult<()> {
        validate_repository_id(repository_id).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    async fn load_existing(&self) -> StorageResult<()> {
        let mut loaded = HashMap::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();

            if name.starts_with(TRASH_PREFIX) {
                if let Err(e) = fs::remove_dir_all(entry.path()).await {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Failed to purge trashed snapshot");
                }
                continue;
            }

            if !entry.file_type().await?.is_dir() || validate_repository_id(&name).is_err() {
                continue;
            }

            match self.load_repository(&name).await {
                Ok(Some(snapshot)) => {
                    loaded.insert(name, Arc::new(snapshot));
                }
                Ok(None) => {
                    tracing::warn!(repository_id = %name, "Removing snapshot directory without a published generation");
                    if let Err(e) = fs::remove_dir_all(entry.path()).await {
                        tracing::warn!(repository_id = %name, error = %e, "Failed to remove unpublished snapshot");
                    }
                }
                Err(e) => {
                    tracing::warn!(repository_id = %name, error = %e, "Skipping unreadable snapshot");
                }
            }
        }

        tracing::info!(
            root = %self.root.display(),
            snapshot_count = loaded.len(),
            "Snapshot store opened"
        );

        *self.snapshots.write().await = loaded;
        Ok(())
    }

    async fn load_repository(&self, repository_id: &str) -> StorageResult<Option<Snapshot>> {
        let repo_dir = self.repo_dir(repository_id);

        let generation = match fs::read_to_string(repo_dir.join(CURRENT_POINTER)).await {
            Ok(s) => s.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let raw = fs::read(repo_dir.join(&generation).join(CATALOG_FILE)).await?;
        let doc: CatalogDocument = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::InvalidCatalog(format!("{}: {}", repository_id, e)))?;

        // Leftovers from an interrupted publish or replace
        let mut children = fs::read_dir(&repo_dir).await?;
        while let Some(child) = children.next_entry().await? {
            let name = child.file_name();
            if name == CURRENT_POINTER || name.to_string_lossy() == generation {
                continue;
            }
            let removed = if child.file_type().await?.is_dir() {
                fs::remove_dir_all(child.path()).await
            } else {
                fs::remove_file(child.path()).await
            };
            if let Err(e) = removed {
                tracing::warn!(path = %child.path().display(), error = %e, "Failed to remove stale snapshot data");
            }
        }

        Ok(Some(Snapshot::new(
            repository_id,
            generation,
            doc.created_at,
            doc.entries,
        )))
    }
}

fn validate_entries(entries: &[FileEntry]) -> StorageResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let normalized = normalize_relative_path(&entry.path)?;
        if normalized != entry.path {
            return Err(StorageError::InvalidCatalog(format!(
                "path is not normalized: {}",
                entry.path
            )));
        }
        if !seen.insert(entry.path.as_str()) {
            return Err(StorageError::InvalidCatalog(format!(
                "duplicate path: {}",
                entry.path
            )));
        }
    }
    Ok(())
}

/// Write a file next to its destination, then rename it into place.
async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Move a staged tree into the store. Falls back to a copy when the staging
/// area lives on another filesystem.
async fn move_tree(src: &Path, dst: &Path) -> StorageResult<()> {
    if fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }

    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        copy_tree(&src, &dst)?;
        std::fs::remove_dir_all(&src)
    })
    .await
    .map_err(|e| StorageError::BackendError(format!("copy task failed: {}", e)))??;
    Ok(())
}

// Symlinks are not copied; cataloged files are regular files by the time they
// are published.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn put(
        &self,
        repository_id: &str,
        staged_root: &Path,
        entries: Vec<FileEntry>,
    ) -> StorageResult<Arc<Snapshot>> {
        Self::check_id(repository_id)?;
        validate_entries(&entries)?;

        let start = std::time::Instant::now();
        let _guard = self.write_lock.lock().await;

        let repo_dir = self.repo_dir(repository_id);
        fs::create_dir_all(&repo_dir).await?;

        let generation = format!("gen-{}", Uuid::new_v4().simple());
        let gen_dir = repo_dir.join(&generation);
        fs::create_dir(&gen_dir).await?;

        let doc = CatalogDocument {
            repository_id: repository_id.to_string(),
            created_at: Utc::now(),
            entries,
        };

        let published: StorageResult<()> = async {
            move_tree(staged_root, &gen_dir.join(FILES_DIR)).await?;
            let catalog = serde_json::to_vec_pretty(&doc)
                .map_err(|e| StorageError::BackendError(format!("catalog encoding: {}", e)))?;
            write_atomic(&gen_dir.join(CATALOG_FILE), &catalog).await?;
            write_atomic(&repo_dir.join(CURRENT_POINTER), generation.as_bytes()).await
        }
        .await;

        if let Err(e) = published {
            tracing::error!(
                repository_id = %repository_id,
                generation = %generation,
                error = %e,
                "Snapshot publish failed"
            );
            let _ = fs::remove_dir_all(&gen_dir).await;
            // Only succeeds when nothing else was ever published here
            let _ = fs::remove_dir(&repo_dir).await;
            return Err(e);
        }

        let snapshot = Arc::new(Snapshot::new(
            repository_id,
            generation.clone(),
            doc.created_at,
            doc.entries,
        ));

        let previous = self
            .snapshots
            .write()
            .await
            .insert(repository_id.to_string(), snapshot.clone());

        if let Some(previous) = previous {
            if previous.generation != generation {
                if let Err(e) = fs::remove_dir_all(repo_dir.join(&previous.generation)).await {
                    tracing::warn!(
                        repository_id = %repository_id,
                        generation = %previous.generation,
                        error = %e,
                        "Failed to remove superseded snapshot generation"
                    );
                }
            }
        }

        tracing::info!(
            repository_id = %repository_id,
            generation = %generation,
            file_count = snapshot.file_count(),
            size_bytes = snapshot.total_bytes(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Snapshot published"
        );

        Ok(snapshot)
    }

    async fn get(&self, repository_id: &str) -> StorageResult<Arc<Snapshot>> {
        self.snapshots
            .read()
            .await
            .get(repository_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("repository {}", repository_id)))
    }

    async fn read_file(&self, snapshot: &Snapshot, path: &str) -> StorageResult<Bytes> {
        let normalized = normalize_relative_path(path)?;
        let repository_id = snapshot.repository_id.as_str();

        if !snapshot.contains(&normalized) {
            return Err(StorageError::NotFound(format!(
                "{} in repository {}",
                normalized, repository_id
            )));
        }

        let files_root = self
            .repo_dir(repository_id)
            .join(&snapshot.generation)
            .join(FILES_DIR);
        let not_found =
            || StorageError::NotFound(format!("{} in repository {}", normalized, repository_id));

        let resolved = match fs::canonicalize(files_root.join(&normalized)).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        if !resolved.starts_with(&files_root) {
            tracing::warn!(
                repository_id = %repository_id,
                path = %normalized,
                "File resolves outside the snapshot root"
            );
            return Err(StorageError::PathRejected(format!(
                "{} resolves outside the repository",
                normalized
            )));
        }

        match fs::read(&resolved).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to read {}: {}",
                normalized, e
            ))),
        }
    }

    async fn delete(&self, repository_id: &str) -> StorageResult<()> {
        Self::check_id(repository_id)?;
        let _guard = self.write_lock.lock().await;

        let removed = self.snapshots.write().await.remove(repository_id);

        let repo_dir = self.repo_dir(repository_id);
        let trash = self
            .root
            .join(format!("{}{}", TRASH_PREFIX, Uuid::new_v4().simple()));

        match fs::rename(&repo_dir, &trash).await {
            Ok(()) => {
                if let Err(e) = fs::remove_dir_all(&trash).await {
                    tracing::warn!(path = %trash.display(), error = %e, "Failed to purge deleted snapshot");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete repository {}: {}",
                    repository_id, e
                )))
            }
        }

        tracing::info!(
            repository_id = %repository_id,
            had_snapshot = removed.is_some(),
            "Snapshot deleted"
        );

        Ok(())
    }

    async fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explainer_core::models::ContentCategory;
    use tempfile::{tempdir, TempDir};

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            size,
            content_type: ContentCategory::Text,
            mime_type: "text/plain".to_string(),
            extension: None,
        }
    }

    fn stage(files: &[(&str, &str)]) -> (TempDir, Vec<FileEntry>) {
        let dir = tempdir().unwrap();
        let mut entries = Vec::new();
        for (path, content) in files {
            let full = dir.path().join("tree").join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, content).unwrap();
            entries.push(entry(path, content.len() as u64));
        }
        std::fs::create_dir_all(dir.path().join("tree")).unwrap();
        (dir, entries)
    }

    async fn read(store: &LocalSnapshotStore, id: &str, path: &str) -> StorageResult<Bytes> {
        let snapshot = store.get(id).await?;
        store.read_file(&snapshot, path).await
    }

    #[tokio::test]
    async fn test_put_get_read() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        let (staging, entries) = stage(&[("README.md", "hello"), ("src/lib.rs", "fn x() {}")]);

        let snapshot = store
            .put("repo-1", &staging.path().join("tree"), entries)
            .await
            .unwrap();
        assert_eq!(snapshot.file_count(), 2);
        assert!(!staging.path().join("tree").exists());

        let got = store.get("repo-1").await.unwrap();
        assert_eq!(got.entries()[1].path, "src/lib.rs");

        let bytes = read(&store, "repo-1", "src/lib.rs").await.unwrap();
        assert_eq!(&bytes[..], b"fn x() {}");

        let bytes = read(&store, "repo-1", "./src//lib.rs").await.unwrap();
        assert_eq!(&bytes[..], b"fn x() {}");
    }

    #[tokio::test]
    async fn test_read_file_rejects_traversal() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();

        let (staging, entries) = stage(&[("a.txt", "a")]);
        store
            .put("repo", &staging.path().join("tree"), entries)
            .await
            .unwrap();
        for path in ["../../etc/passwd", "/etc/passwd", "a/../../x", ".."] {
            let result = read(&store, "repo", path).await;
            assert!(
                matches!(result, Err(StorageError::PathRejected(_))),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_read_file_not_found_cases() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        let (staging, entries) = stage(&[("a.txt", "a")]);
        store
            .put("repo", &staging.path().join("tree"), entries)
            .await
            .unwrap();

        assert!(matches!(
            read(&store, "repo", "missing.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            read(&store, "other", "a.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get("other").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        let (staging, entries) = stage(&[("a.txt", "a")]);
        store
            .put("repo", &staging.path().join("tree"), entries)
            .await
            .unwrap();

        store.delete("repo").await.unwrap();
        store.delete("repo").await.unwrap();
        store.delete("never-existed").await.unwrap();

        assert!(matches!(
            store.get("repo").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!root.path().join("repo").exists());
        assert!(store.list_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces_previous_snapshot() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();

        let (first, entries) = stage(&[("old.txt", "old")]);
        let old = store
            .put("repo", &first.path().join("tree"), entries)
            .await
            .unwrap();

        let (second, entries) = stage(&[("new.txt", "new")]);
        let new = store
            .put("repo", &second.path().join("tree"), entries)
            .await
            .unwrap();

        assert_ne!(old.generation, new.generation);
        assert!(matches!(
            read(&store, "repo", "old.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(&read(&store, "repo", "new.txt").await.unwrap()[..], b"new");
        assert!(!root.path().join("repo").join(&old.generation).exists());
    }

    #[tokio::test]
    async fn test_reopen_loads_published_snapshots() {
        let root = tempdir().unwrap();
        {
            let store = LocalSnapshotStore::open(root.path()).await.unwrap();
            let (staging, entries) = stage(&[("z.txt", "z"), ("a.txt", "a")]);
            store
                .put("repo", &staging.path().join("tree"), entries)
                .await
                .unwrap();
        }
        // An interrupted publish leaves a directory without CURRENT
        std::fs::create_dir_all(root.path().join("half").join("gen-x")).unwrap();

        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        assert_eq!(store.list_ids().await, vec!["repo".to_string()]);
        let snapshot = store.get("repo").await.unwrap();
        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["z.txt", "a.txt"]);
        assert!(!root.path().join("half").exists());
    }

    #[tokio::test]
    async fn test_put_rejects_bad_catalogs() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        let (staging, _) = stage(&[("a.txt", "a")]);
        let tree = staging.path().join("tree");

        let dup = vec![entry("a.txt", 1), entry("a.txt", 1)];
        assert!(matches!(
            store.put("repo", &tree, dup).await,
            Err(StorageError::InvalidCatalog(_))
        ));

        let escaping = vec![entry("../a.txt", 1)];
        assert!(matches!(
            store.put("repo", &tree, escaping).await,
            Err(StorageError::PathRejected(_))
        ));

        assert!(matches!(
            store.put("../evil", &tree, vec![entry("a.txt", 1)]).await,
            Err(StorageError::InvalidKey(_))
        ));

        // Staged tree untouched by rejected publishes
        assert!(tree.join("a.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_file_rejects_symlink_escaping_root() {
        let root = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), "top secret").unwrap();

        let store = LocalSnapshotStore::open(root.path()).await.unwrap();
        let (staging, mut entries) = stage(&[("a.txt", "a")]);
        let tree = staging.path().join("tree");
        std::os::unix::fs::symlink(outside.path().join("secret"), tree.join("link")).unwrap();
        entries.push(entry("link", 10));

        store.put("repo", &tree, entries).await.unwrap();
        assert!(matches!(
            read(&store, "repo", "link").await,
            Err(StorageError::PathRejected(_))
        ));
    }

    #[test]
    fn test_copy_tree_mirrors_nested_directories() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("a/b/c")).unwrap();
        std::fs::create_dir_all(src.path().join("empty")).unwrap();
        std::fs::write(src.path().join("top.txt"), "top").unwrap();
        std::fs::write(src.path().join("a/b/c/deep.rs"), "fn deep() {}").unwrap();

        let target = dst.path().join("files");
        copy_tree(src.path(), &target).unwrap();

        assert_eq!(std::fs::read_to_string(target.join("top.txt")).unwrap(), "top");
        assert_eq!(
            std::fs::read_to_string(target.join("a/b/c/deep.rs")).unwrap(),
            "fn deep() {}"
        );
        assert!(target.join("empty").is_dir());
    }

    #[tokio::test]
    async fn test_held_snapshot_never_reads_newer_content() {
        let root = tempdir().unwrap();
        let store = LocalSnapshotStore::open(root.path()).await.unwrap();

        let (first, entries) = stage(&[("a.txt", "first version")]);
        let old = store
            .put("repo", &first.path().join("tree"), entries)
            .await
            .unwrap();
        let (second, entries) = stage(&[("a.txt", "v2")]);
        let new = store
            .put("repo", &second.path().join("tree"), entries)
            .await
            .unwrap();

        match store.read_file(&old, "a.txt").await {
            Ok(bytes) => assert_eq!(&bytes[..], b"first version"),
            Err(e) => assert!(matches!(e, StorageError::NotFound(_))),
        }
        assert_eq!(&store.read_file(&new, "a.txt").await.unwrap()[..], b"v2");
    }

    const LONG: &str = "long content that should never be observed in part";

    async fn read_until_stopped(
        store: Arc<LocalSnapshotStore>,
        stop: Arc<std::sync::atomic::AtomicBool>,
    ) -> usize {
        let mut reads = 0;
        while !stop.load(std::sync::atomic::Ordering::SeqCst) {
            match read(&store, "repo", "a.txt").await {
                Ok(bytes) => {
                    assert!(
                        &bytes[..] == LONG.as_bytes() || &bytes[..] == b"short",
                        "mixed read: {:?}",
                        bytes
                    );
                    reads += 1;
                }
                Err(StorageError::NotFound(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
            tokio::task::yield_now().await;
        }
        reads
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_during_replace_are_whole() {
        let root = tempdir().unwrap();
        let store = Arc::new(LocalSnapshotStore::open(root.path()).await.unwrap());
        let (staging, entries) = stage(&[("a.txt", LONG)]);
        store
            .put("repo", &staging.path().join("tree"), entries)
            .await
            .unwrap();

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| tokio::spawn(read_until_stopped(store.clone(), stop.clone())))
            .collect();

        for i in 0..20 {
            let content = if i % 2 == 0 { "short" } else { LONG };
            let (staging, entries) = stage(&[("a.txt", content)]);
            store
                .put("repo", &staging.path().join("tree"), entries)
                .await
                .unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::SeqCst);

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.list_ids().await, vec!["repo".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_during_delete_are_whole_or_not_found() {
        let root = tempdir().unwrap();
        let store = Arc::new(LocalSnapshotStore::open(root.path()).await.unwrap());

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| tokio::spawn(read_until_stopped(store.clone(), stop.clone())))
            .collect();

        for _ in 0..10 {
            let (staging, entries) = stage(&[("a.txt", LONG)]);
            store
                .put("repo", &staging.path().join("tree"), entries)
                .await
                .unwrap();
            tokio::task::yield_now().await;
            store.delete("repo").await.unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::SeqCst);

        for reader in readers {
            reader.await.unwrap();
        }
        assert!(matches!(
            read(&store, "repo", "a.txt").await,
            Err(StorageError::NotFound(_))
        ));
        // nothing but the store root is left behind
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
