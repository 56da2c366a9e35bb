//! Source acquisition: bring a repository's files into a staging directory

pub mod archive;
pub mod git;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use explainer_core::models::{ArchiveFormat, RepositoryOrigin};
use tokio_util::sync::CancellationToken;

use crate::error::{IngestError, IngestResult};
use crate::quota::Quota;

pub use archive::{extract_archive, ExtractionReport};
pub use git::{validate_branch, validate_remote_url, GitCloner};

/// What the caller handed us to ingest.
#[derive(Debug, Clone)]
pub enum SourceInput {
    Remote {
        url: String,
        branch: Option<String>,
    },
    Archive {
        filename: String,
        data: Bytes,
    },
}

impl SourceInput {
    pub fn is_remote(&self) -> bool {
        matches!(self, SourceInput::Remote { .. })
    }
}

/// Acquires a source into a fresh directory.
#[async_trait]
pub trait SourceAcquirer: Send + Sync {
    /// Cheap upfront checks, run before any record is created.
    fn validate(&self, input: &SourceInput) -> IngestResult<RepositoryOrigin>;

    /// Populate `dest` (which must not exist yet) with the source's files.
    async fn acquire(
        &self,
        input: &SourceInput,
        dest: &Path,
        quota: Quota,
        cancel: &CancellationToken,
    ) -> IngestResult<()>;
}

/// Git clones for remote origins, in-process extraction for archives.
#[derive(Debug, Clone)]
pub struct DefaultAcquirer {
    cloner: GitCloner,
    allowed_hosts: Option<Vec<String>>,
}

impl DefaultAcquirer {
    pub fn new(git_path: impl Into<String>, allowed_hosts: Option<Vec<String>>) -> Self {
        DefaultAcquirer {
            cloner: GitCloner::new(git_path),
            allowed_hosts: allowed_hosts
                .map(|hosts| hosts.into_iter().map(|h| h.to_lowercase()).collect()),
        }
    }

    fn archive_format(filename: &str, data: &[u8]) -> IngestResult<ArchiveFormat> {
        if data.is_empty() {
            return Err(IngestError::CorruptArchive("archive is empty".to_string()));
        }
        ArchiveFormat::sniff(data)
            .or_else(|| ArchiveFormat::from_filename(filename))
            .ok_or_else(|| {
                IngestError::CorruptArchive(format!(
                    "unrecognized archive format for '{}' (expected zip, tar or tar.gz)",
                    filename
                ))
            })
    }
}

#[async_trait]
impl SourceAcquirer for DefaultAcquirer {
    fn validate(&self, input: &SourceInput) -> IngestResult<RepositoryOrigin> {
        match input {
            SourceInput::Remote { url, branch } => {
                let parsed = validate_remote_url(url, self.allowed_hosts.as_deref())?;
                if let Some(branch) = branch {
                    validate_branch(branch)?;
                }
                Ok(RepositoryOrigin::Remote {
                    url: parsed.to_string(),
                    branch: branch.clone(),
                })
            }
            SourceInput::Archive { filename, data } => Ok(RepositoryOrigin::Archive {
                filename: filename.clone(),
                format: Self::archive_format(filename, data)?,
            }),
        }
    }

    async fn acquire(
        &self,
        input: &SourceInput,
        dest: &Path,
        quota: Quota,
        cancel: &CancellationToken,
    ) -> IngestResult<()> {
        match input {
            SourceInput::Remote { url, branch } => {
                let parsed = validate_remote_url(url, self.allowed_hosts.as_deref())?;
                self.cloner
                    .clone_into(parsed.as_str(), branch.as_deref(), dest, quota, cancel)
                    .await
            }
            SourceInput::Archive { filename, data } => {
                let format = Self::archive_format(filename, data)?;
                let data = data.clone();
                let dest: PathBuf = dest.to_path_buf();
                let cancel = cancel.clone();
                tokio::task::spawn_blocking(move || {
                    extract_archive(&data, format, &dest, quota, &cancel).map(|_| ())
                })
                .await
                .map_err(|e| IngestError::Internal(format!("extraction task failed: {}", e)))?
            }
        }
    }
}
