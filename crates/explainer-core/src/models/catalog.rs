use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse content classification of a cataloged file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Source,
    Markup,
    Config,
    Data,
    Document,
    Image,
    Audio,
    Video,
    Archive,
    Text,
    Binary,
}

impl ContentCategory {
    /// Whether files of this category are human readable text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ContentCategory::Source
                | ContentCategory::Markup
                | ContentCategory::Config
                | ContentCategory::Data
                | ContentCategory::Document
                | ContentCategory::Text
        )
    }
}

impl Display for ContentCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ContentCategory::Source => "source",
            ContentCategory::Markup => "markup",
            ContentCategory::Config => "config",
            ContentCategory::Data => "data",
            ContentCategory::Document => "document",
            ContentCategory::Image => "image",
            ContentCategory::Audio => "audio",
            ContentCategory::Video => "video",
            ContentCategory::Archive => "archive",
            ContentCategory::Text => "text",
            ContentCategory::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// One file of a repository snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FileEntry {
    /// Relative, `/`-separated path without `.` or `..` segments.
    pub path: String,
    pub size: u64,
    pub content_type: ContentCategory,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl FileEntry {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Immutable point-in-time catalog of a repository's files.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub repository_id: String,
    /// Opaque name of the on-disk generation holding the files.
    pub generation: String,
    pub created_at: DateTime<Utc>,
    entries: Vec<FileEntry>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new(
        repository_id: impl Into<String>,
        generation: impl Into<String>,
        created_at: DateTime<Utc>,
        entries: Vec<FileEntry>,
    ) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        Snapshot {
            repository_id: repository_id.into(),
            generation: generation.into(),
            created_at,
            entries,
            index,
        }
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Serialized form of a snapshot catalog as written next to the files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub repository_id: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<FileEntry>,
}

/// Catalog listing returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogResponse {
    pub repository_id: String,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
    pub total_bytes: u64,
    pub files: Vec<FileEntry>,
}

impl CatalogResponse {
    /// Build a listing, optionally keeping only files with the given extension
    /// (compared case-insensitively, leading dot optional).
    pub fn from_snapshot(snapshot: &Snapshot, extension: Option<&str>) -> Self {
        let wanted = extension
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty());
        let files: Vec<FileEntry> = snapshot
            .entries()
            .iter()
            .filter(|e| match &wanted {
                Some(ext) => e.extension.as_deref() == Some(ext.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        CatalogResponse {
            repository_id: snapshot.repository_id.clone(),
            created_at: snapshot.created_at,
            file_count: files.len(),
            total_bytes: files.iter().map(|e| e.size).sum(),
            files,
        }
    }
}
