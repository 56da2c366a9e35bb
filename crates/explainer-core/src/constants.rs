//! Shared limits and defaults

/// Default upper bound on the total bytes of one repository snapshot.
pub const DEFAULT_MAX_REPOSITORY_SIZE_MB: u64 = 80;

/// Default upper bound on the number of files in one repository snapshot.
pub const DEFAULT_MAX_REPOSITORY_FILES: usize = 10_000;

/// Default upper bound on an uploaded archive.
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 80;

pub const DEFAULT_INGEST_TIMEOUT_SECS: u64 = 300;

/// Bytes inspected when sniffing an unknown file for text vs binary.
pub const SNIFF_BYTES: usize = 8 * 1024;

/// Maximum length of a caller supplied repository identifier.
pub const MAX_REPOSITORY_ID_LEN: usize = 64;

pub const DEFAULT_QA_MAX_CONTEXT_BYTES: usize = 200_000;

/// Maximum length of text sent to speech synthesis.
pub const MAX_SPEECH_TEXT_CHARS: usize = 5_000;

pub const MAX_QUESTION_CHARS: usize = 4_000;

/// Maximum size of a snippet submitted for explanation.
pub const MAX_EXPLAIN_CODE_BYTES: usize = 100_000;

pub const MB: u64 = 1024 * 1024;
