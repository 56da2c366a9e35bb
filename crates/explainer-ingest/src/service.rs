//! Ingestion orchestration
//!
//! `begin` validates a request, claims the repository id and records it as
//! pending; `spawn` or `complete` does the slow part (acquire, catalog,
//! publish) on its own task and settles the record as ready or failed. At most
//! one ingestion per id is in flight; a second request for the same id is
//! rejected with `Conflict`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use explainer_core::models::{
    FileEntry, IngestFailure, Repository, RepositoryStatus, Snapshot,
};
use explainer_core::validation::validate_repository_id;
use explainer_core::ErrorMetadata;
use explainer_storage::{normalize_relative_path, SnapshotStore, StorageError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::acquirer::{SourceAcquirer, SourceInput};
use crate::cataloger::{catalog_tree, materialize_links, Catalog};
use crate::error::{IngestError, IngestResult};
use crate::quota::Quota;
use crate::registry::RepositoryRegistry;

/// A request to ingest a repository.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Caller-chosen id; a UUID is generated when absent.
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub source: SourceInput,
}

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Releases the id's in-flight claim when dropped.
struct InFlightGuard {
    id: String,
    in_flight: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.id);
        }
    }
}

/// An accepted ingestion holding its id claim, ready to `run`.
pub struct PreparedIngestion {
    repository: Repository,
    source: SourceInput,
    _guard: InFlightGuard,
}

impl PreparedIngestion {
    /// The pending record as it was created.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

pub struct IngestionService {
    store: Arc<dyn SnapshotStore>,
    registry: Arc<RepositoryRegistry>,
    acquirer: Arc<dyn SourceAcquirer>,
    staging_dir: PathBuf,
    quota: Quota,
    timeout: Duration,
    in_flight: InFlight,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        registry: Arc<RepositoryRegistry>,
        acquirer: Arc<dyn SourceAcquirer>,
        staging_dir: impl Into<PathBuf>,
        quota: Quota,
        timeout: Duration,
    ) -> Self {
        IngestionService {
            store,
            registry,
            acquirer,
            staging_dir: staging_dir.into(),
            quota,
            timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    fn claim(&self, id: &str) -> IngestResult<InFlightGuard> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| IngestError::Internal("in-flight set poisoned".to_string()))?;
        if !set.insert(id.to_string()) {
            return Err(IngestError::Conflict(id.to_string()));
        }
        Ok(InFlightGuard {
            id: id.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }

    /// Whether an ingestion for `id` is currently running.
    fn is_ingesting(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }

    /// Validate the request, claim the id and record it as pending.
    ///
    /// Malformed origins are rejected here without creating a record.
    pub async fn begin(&self, req: IngestRequest) -> IngestResult<PreparedIngestion> {
        let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        validate_repository_id(&id).map_err(|e| IngestError::InvalidInput(e.client_message()))?;

        let origin = self.acquirer.validate(&req.source)?;
        let guard = self.claim(&id)?;

        let mut repository = Repository::new(id, req.name, req.description, origin);
        if let Some(existing) = self.registry.get(&repository.id).await {
            repository.created_at = existing.created_at;
        }
        self.registry.upsert(repository.clone()).await?;

        tracing::info!(
            repository_id = %repository.id,
            remote = repository.origin.is_remote(),
            "Ingestion accepted"
        );

        Ok(PreparedIngestion {
            repository,
            source: req.source,
            _guard: guard,
        })
    }

    /// Run an accepted ingestion to completion and return the settled record.
    async fn run(&self, prepared: PreparedIngestion) -> Repository {
        let PreparedIngestion {
            repository,
            source,
            _guard,
        } = prepared;
        let id = repository.id.clone();
        let start = Instant::now();

        let staging = self
            .staging_dir
            .join(format!("{}-{}", id, Uuid::new_v4().simple()));
        let cancel = CancellationToken::new();

        let outcome = self.ingest(&id, &source, &staging, &cancel).await;
        cancel.cancel();
        remove_staging(&staging).await;

        let settled = match outcome {
            Ok(catalog) => {
                let updated = self
                    .registry
                    .update(&id, |r| {
                        r.status = RepositoryStatus::Ready;
                        r.file_count = catalog.file_count();
                        r.total_bytes = catalog.total_bytes;
                        r.language_stats = catalog.language_stats.clone();
                        r.failure = None;
                    })
                    .await;
                match updated {
                    Ok(Some(repo)) => {
                        tracing::info!(
                            repository_id = %id,
                            file_count = repo.file_count,
                            size_bytes = repo.total_bytes,
                            omitted = catalog.omitted.len(),
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "Ingestion completed"
                        );
                        Ok(repo)
                    }
                    Ok(None) => {
                        // Deleted while we were working; drop what we just published
                        tracing::info!(repository_id = %id, "Repository deleted during ingestion");
                        self.discard_snapshot(&id).await;
                        let mut gone = repository.clone();
                        gone.status = RepositoryStatus::Deleted;
                        Ok(gone)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match settled {
            Ok(repo) => repo,
            Err(e) => self.fail(&repository, e, start).await,
        }
    }

    /// Start an accepted ingestion on the runtime.
    pub fn spawn(self: &Arc<Self>, prepared: PreparedIngestion) -> JoinHandle<Repository> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.run(prepared).await })
    }

    /// Run an accepted ingestion on its own task and wait for it to settle.
    ///
    /// Dropping the returned future stops the wait, not the ingestion.
    pub async fn complete(self: &Arc<Self>, prepared: PreparedIngestion) -> IngestResult<Repository> {
        self.spawn(prepared)
            .await
            .map_err(|e| IngestError::Internal(format!("ingestion task failed: {}", e)))
    }

    /// Drop snapshots that no settled, ready record vouches for.
    ///
    /// Run once at startup, after the registry has failed interrupted
    /// ingestions. Ids with an ingestion in flight are left alone.
    pub async fn reconcile(&self) -> IngestResult<usize> {
        let mut removed = 0;
        for id in self.store.list_ids().await {
            if self.is_ingesting(&id) {
                continue;
            }
            let keep = matches!(
                self.registry.get(&id).await,
                Some(repo) if repo.status == RepositoryStatus::Ready
            );
            if keep {
                continue;
            }
            tracing::warn!(repository_id = %id, "Removing snapshot without a ready record");
            self.store.delete(&id).await?;
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(removed, "Snapshot store reconciled");
        }
        Ok(removed)
    }

    async fn ingest(
        &self,
        id: &str,
        source: &SourceInput,
        staging: &Path,
        cancel: &CancellationToken,
    ) -> IngestResult<Catalog> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;

        let prepared = tokio::time::timeout(self.timeout, self.prepare_tree(source, staging, cancel))
            .await;

        let catalog = match prepared {
            Ok(result) => result?,
            Err(_) => {
                cancel.cancel();
                let secs = self.timeout.as_secs_f64();
                return Err(if source.is_remote() {
                    IngestError::UnreachableRemote(format!(
                        "acquisition did not finish within {:.0}s",
                        secs
                    ))
                } else {
                    IngestError::CorruptArchive(format!(
                        "extraction did not finish within {:.0}s",
                        secs
                    ))
                });
            }
        };

        self.store
            .put(id, staging, catalog.entries.clone())
            .await?;

        Ok(catalog)
    }

    /// Acquire and catalog the source in `staging`.
    async fn prepare_tree(
        &self,
        source: &SourceInput,
        staging: &Path,
        cancel: &CancellationToken,
    ) -> IngestResult<Catalog> {
        self.acquirer
            .acquire(source, staging, self.quota, cancel)
            .await?;

        let root = staging.to_path_buf();
        let task_cancel = cancel.clone();
        let catalog = tokio::task::spawn_blocking(move || -> IngestResult<Catalog> {
            let catalog = catalog_tree(&root, &task_cancel)?;
            materialize_links(&root, &catalog.entries)?;
            Ok(catalog)
        })
        .await
        .map_err(|e| IngestError::Internal(format!("catalog task failed: {}", e)))??;

        self.quota
            .check_totals(catalog.total_bytes, catalog.file_count())?;

        Ok(catalog)
    }

    async fn fail(&self, repository: &Repository, err: IngestError, start: Instant) -> Repository {
        let id = &repository.id;
        let failure = IngestFailure {
            kind: err.kind(),
            message: err.to_string(),
        };

        tracing::warn!(
            repository_id = %id,
            kind = %failure.kind,
            error = %err,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Ingestion failed"
        );

        self.discard_snapshot(id).await;

        let recorded = failure.clone();
        match self
            .registry
            .update(id, move |r| {
                r.status = RepositoryStatus::Failed;
                r.file_count = 0;
                r.total_bytes = 0;
                r.language_stats.clear();
                r.failure = Some(recorded);
            })
            .await
        {
            Ok(Some(repo)) => repo,
            Ok(None) => {
                let mut gone = repository.clone();
                gone.status = RepositoryStatus::Deleted;
                gone
            }
            Err(e) => {
                tracing::error!(repository_id = %id, error = %e, "Failed to record ingestion failure");
                let mut failed = repository.clone();
                failed.status = RepositoryStatus::Failed;
                failed.failure = Some(failure);
                failed
            }
        }
    }

    async fn discard_snapshot(&self, id: &str) {
        if let Err(e) = self.store.delete(id).await {
            tracing::error!(repository_id = %id, error = %e, "Failed to remove snapshot");
        }
    }

    pub async fn get(&self, id: &str) -> IngestResult<Repository> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| IngestError::NotFound(format!("repository {}", id)))
    }

    pub async fn list(&self) -> Vec<Repository> {
        self.registry.list().await
    }

    /// Published snapshot of a known repository.
    ///
    /// A failed repository has no snapshot. A pending re-ingestion still
    /// serves the previous one until it settles.
    pub async fn catalog(&self, id: &str) -> IngestResult<Arc<Snapshot>> {
        let repo = self.get(id).await?;
        if repo.status == RepositoryStatus::Failed {
            return Err(IngestError::NotFound(format!("snapshot of repository {}", id)));
        }
        self.store.get(id).await.map_err(|e| match e {
            StorageError::NotFound(_) => {
                IngestError::NotFound(format!("snapshot of repository {}", id))
            }
            other => other.into(),
        })
    }

    /// Read one file of a repository's snapshot along with its catalog entry.
    ///
    /// Paths that could leave the repository root are rejected before the
    /// repository is even looked up.
    pub async fn read_file(&self, id: &str, path: &str) -> IngestResult<(FileEntry, Bytes)> {
        normalize_relative_path(path)?;
        let snapshot = self.catalog(id).await?;
        self.read_snapshot_file(&snapshot, path).await
    }

    /// Read a file from a snapshot already obtained through [`Self::catalog`],
    /// so several reads see one generation.
    pub async fn read_snapshot_file(
        &self,
        snapshot: &Snapshot,
        path: &str,
    ) -> IngestResult<(FileEntry, Bytes)> {
        let rel = normalize_relative_path(path)?;
        let entry = snapshot
            .entry(&rel)
            .cloned()
            .ok_or_else(|| IngestError::NotFound(format!("file {}", rel)))?;
        let bytes = self.store.read_file(snapshot, &rel).await?;
        Ok((entry, bytes))
    }

    /// Remove a repository's record and snapshot. Deleting an unknown or
    /// already deleted repository is not an error.
    ///
    /// An ingestion still running for the id notices the missing record when
    /// it finishes and discards its snapshot.
    pub async fn delete(&self, id: &str) -> IngestResult<Option<Repository>> {
        validate_repository_id(id).map_err(|e| IngestError::InvalidInput(e.client_message()))?;
        let removed = self.registry.remove(id).await?;
        self.store.delete(id).await?;
        tracing::info!(repository_id = %id, existed = removed.is_some(), "Repository deleted");
        Ok(removed)
    }
}

async fn remove_staging(staging: &Path) {
    match tokio::fs::remove_dir_all(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging directory")
        }
    }
}
