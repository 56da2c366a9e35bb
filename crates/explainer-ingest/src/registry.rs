//! Repository records, one JSON document per repository
//!
//! Records are cached in memory and written through to disk while the write
//! lock is held, so the on-disk state never runs ahead of or behind the cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use explainer_core::models::{IngestErrorKind, IngestFailure, Repository, RepositoryStatus};
use explainer_core::validation::validate_repository_id;
use explainer_core::ErrorMetadata;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{IngestError, IngestResult};

pub struct RepositoryRegistry {
    dir: PathBuf,
    records: RwLock<HashMap<String, Repository>>,
}

impl RepositoryRegistry {
    /// Load every record under `dir`, creating the directory if needed.
    ///
    /// Records left `pending` by a previous process can never complete and
    /// are marked failed.
    pub async fn open(dir: impl Into<PathBuf>) -> IngestResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let mut records = HashMap::new();
        let mut interrupted = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            let mut repo: Repository = match serde_json::from_slice(&bytes) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable repository record");
                    continue;
                }
            };
            if repo.status == RepositoryStatus::Pending {
                repo.status = RepositoryStatus::Failed;
                let kind = if repo.origin.is_remote() {
                    IngestErrorKind::UnreachableRemote
                } else {
                    IngestErrorKind::CorruptArchive
                };
                repo.failure = Some(IngestFailure {
                    kind,
                    message: "ingestion interrupted by a restart".to_string(),
                });
                repo.updated_at = Utc::now();
                interrupted.push(repo.clone());
            }
            records.insert(repo.id.clone(), repo);
        }

        let registry = RepositoryRegistry {
            dir,
            records: RwLock::new(records),
        };

        for repo in &interrupted {
            tracing::warn!(repository_id = %repo.id, "Marking interrupted ingestion as failed");
            registry.persist(repo).await?;
        }

        tracing::info!(
            count = registry.records.read().await.len(),
            "Repository registry loaded"
        );

        Ok(registry)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn persist(&self, repo: &Repository) -> IngestResult<()> {
        let data = serde_json::to_vec_pretty(repo)
            .map_err(|e| IngestError::Internal(format!("record encoding: {}", e)))?;
        write_atomic(&self.record_path(&repo.id), &data).await
    }

    /// Insert or replace a record.
    pub async fn upsert(&self, repo: Repository) -> IngestResult<()> {
        validate_repository_id(&repo.id).map_err(|e| IngestError::InvalidInput(e.client_message()))?;
        let mut records = self.records.write().await;
        self.persist(&repo).await?;
        records.insert(repo.id.clone(), repo);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Repository> {
        self.records.read().await.get(id).cloned()
    }

    /// All records, newest first.
    pub async fn list(&self) -> Vec<Repository> {
        let mut repos: Vec<Repository> = self.records.read().await.values().cloned().collect();
        repos.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        repos
    }

    /// Apply `f` to an existing record and persist it. Returns `None` when the
    /// record does not exist.
    pub async fn update<F>(&self, id: &str, f: F) -> IngestResult<Option<Repository>>
    where
        F: FnOnce(&mut Repository),
    {
        let mut records = self.records.write().await;
        let Some(current) = records.get(id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        f(&mut updated);
        updated.updated_at = Utc::now();
        self.persist(&updated).await?;
        records.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    /// Remove a record. Returns the removed record, if there was one.
    pub async fn remove(&self, id: &str) -> IngestResult<Option<Repository>> {
        let mut records = self.records.write().await;
        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(records.remove(id))
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> IngestResult<()> {
    let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4().simple()));
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
