//! Per-repository storage limits

use crate::error::{IngestError, IngestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Quota {
    pub fn new(max_bytes: u64, max_files: usize) -> Self {
        Quota {
            max_bytes,
            max_files,
        }
    }

    /// Check totals known up front (archive headers, finished clone).
    pub fn check_totals(&self, total_bytes: u64, file_count: usize) -> IngestResult<()> {
        if file_count > self.max_files {
            return Err(IngestError::QuotaExceeded(format!(
                "{} files exceeds the limit of {}",
                file_count, self.max_files
            )));
        }
        if total_bytes > self.max_bytes {
            return Err(IngestError::QuotaExceeded(format!(
                "{} bytes exceeds the limit of {}",
                total_bytes, self.max_bytes
            )));
        }
        Ok(())
    }

    pub fn meter(&self) -> QuotaMeter {
        QuotaMeter {
            quota: *self,
            bytes: 0,
            files: 0,
        }
    }
}

/// Running usage while files are written.
#[derive(Debug)]
pub struct QuotaMeter {
    quota: Quota,
    bytes: u64,
    files: usize,
}

impl QuotaMeter {
    pub fn add_file(&mut self) -> IngestResult<()> {
        self.files += 1;
        self.quota.check_totals(self.bytes, self.files)
    }

    pub fn add_bytes(&mut self, n: u64) -> IngestResult<()> {
        self.bytes = self.bytes.saturating_add(n);
        self.quota.check_totals(self.bytes, self.files)
    }

    /// Bytes still available before the quota is exceeded.
    pub fn remaining_bytes(&self) -> u64 {
        self.quota.max_bytes.saturating_sub(self.bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn files(&self) -> usize {
        self.files
    }
}
