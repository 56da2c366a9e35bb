use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryStatus {
    Pending,
    Ready,
    Failed,
    Deleted,
}

impl Display for RepositoryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RepositoryStatus::Pending => write!(f, "pending"),
            RepositoryStatus::Ready => write!(f, "ready"),
            RepositoryStatus::Failed => write!(f, "failed"),
            RepositoryStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for RepositoryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RepositoryStatus::Pending),
            "ready" => Ok(RepositoryStatus::Ready),
            "failed" => Ok(RepositoryStatus::Failed),
            "deleted" => Ok(RepositoryStatus::Deleted),
            _ => Err(anyhow::anyhow!("Invalid repository status: {}", s)),
        }
    }
}

/// Archive container formats accepted for uploads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Guess the format from an uploaded file name.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    /// Detect the format from the leading bytes of the archive.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
            Some(ArchiveFormat::Zip)
        } else if bytes.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveFormat::TarGz)
        } else if bytes.len() > 262 && &bytes[257..262] == b"ustar" {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }
}

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::Tar => write!(f, "tar"),
            ArchiveFormat::TarGz => write!(f, "tar_gz"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tar_gz" | "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            _ => Err(anyhow::anyhow!("Invalid archive format: {}", s)),
        }
    }
}

/// Where a repository's files came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositoryOrigin {
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    Archive {
        filename: String,
        format: ArchiveFormat,
    },
}

impl RepositoryOrigin {
    pub fn is_remote(&self) -> bool {
        matches!(self, RepositoryOrigin::Remote { .. })
    }

    /// Display name derived from the origin (last URL segment or archive stem).
    pub fn default_name(&self) -> String {
        match self {
            RepositoryOrigin::Remote { url, .. } => {
                let trimmed = url.trim_end_matches('/');
                let last = trimmed.rsplit(|c: char| c == '/' || c == ':').next().unwrap_or(trimmed);
                last.trim_end_matches(".git").to_string()
            }
            RepositoryOrigin::Archive { filename, .. } => {
                let lower = filename.to_lowercase();
                let cut = [".tar.gz", ".tgz", ".tar", ".zip"]
                    .iter()
                    .find(|ext| lower.ends_with(*ext))
                    .map(|ext| filename.len() - ext.len())
                    .unwrap_or(filename.len());
                filename[..cut].to_string()
            }
        }
    }
}

/// Kinds of ingestion failure recorded on a failed repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorKind {
    InvalidOrigin,
    UnreachableRemote,
    CorruptArchive,
    QuotaExceeded,
    PathRejected,
    NotFound,
    Conflict,
    Internal,
}

impl Display for IngestErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            IngestErrorKind::InvalidOrigin => "invalid_origin",
            IngestErrorKind::UnreachableRemote => "unreachable_remote",
            IngestErrorKind::CorruptArchive => "corrupt_archive",
            IngestErrorKind::QuotaExceeded => "quota_exceeded",
            IngestErrorKind::PathRejected => "path_rejected",
            IngestErrorKind::NotFound => "not_found",
            IngestErrorKind::Conflict => "conflict",
            IngestErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct IngestFailure {
    pub kind: IngestErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Repository {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub origin: RepositoryOrigin,
    pub status: RepositoryStatus,
    pub file_count: usize,
    pub total_bytes: u64,
    /// File count per lower-cased extension; files without one are counted under "".
    pub language_stats: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<IngestFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(
        id: String,
        name: Option<String>,
        description: Option<String>,
        origin: RepositoryOrigin,
    ) -> Self {
        let now = Utc::now();
        Repository {
            id,
            name: name.unwrap_or_else(|| origin.default_name()),
            description,
            origin,
            status: RepositoryStatus::Pending,
            file_count: 0,
            total_bytes: 0,
            language_stats: BTreeMap::new(),
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == RepositoryStatus::Ready
    }
}
