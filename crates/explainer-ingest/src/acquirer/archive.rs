//! Archive extraction (zip, tar, tar.gz) into a staging directory
//!
//! Entry names that are absolute or contain `..` are left out with a warning,
//! as are symlink and hard-link entries. Bytes actually written are metered
//! against the quota, so a lying header cannot exhaust the disk.

use std::fs::{self, OpenOptions};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use explainer_core::models::ArchiveFormat;
use explainer_storage::normalize_relative_path;
use flate2::read::GzDecoder;
use tokio_util::sync::CancellationToken;

use crate::error::{IngestError, IngestResult};
use crate::quota::{Quota, QuotaMeter};

const COPY_BUFFER: usize = 64 * 1024;
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Summary of one extraction.
#[derive(Debug, Default, Clone)]
pub struct ExtractionReport {
    pub files_written: usize,
    pub bytes_written: u64,
    /// Entry names that were skipped.
    pub skipped: Vec<String>,
}

/// Extract `data` into `dest`. Blocking; run it on a blocking thread.
pub fn extract_archive(
    data: &[u8],
    format: ArchiveFormat,
    dest: &Path,
    quota: Quota,
    cancel: &CancellationToken,
) -> IngestResult<ExtractionReport> {
    fs::create_dir_all(dest)?;
    let mut meter = quota.meter();
    let mut report = ExtractionReport::default();

    match format {
        ArchiveFormat::Zip => extract_zip(data, dest, &quota, &mut meter, &mut report, cancel)?,
        ArchiveFormat::Tar => {
            extract_tar(Cursor::new(data), dest, &mut meter, &mut report, cancel)?
        }
        ArchiveFormat::TarGz => extract_tar(
            GzDecoder::new(Cursor::new(data)),
            dest,
            &mut meter,
            &mut report,
            cancel,
        )?,
    }

    report.files_written = meter.files();
    report.bytes_written = meter.bytes();

    tracing::info!(
        format = %format,
        files_written = report.files_written,
        bytes_written = report.bytes_written,
        skipped = report.skipped.len(),
        "Archive extracted"
    );

    Ok(report)
}

fn corrupt(context: &str, detail: impl std::fmt::Display) -> IngestError {
    IngestError::CorruptArchive(format!("{}: {}", context, detail))
}

/// Entry name as a safe relative path, or `None` (after logging) when it must be skipped.
fn safe_entry_path(name: &str, report: &mut ExtractionReport) -> Option<String> {
    match normalize_relative_path(name) {
        Ok(rel) => Some(rel),
        Err(e) => {
            // "./" style root entries are harmless and not worth a warning
            if !name.trim_start_matches("./").trim_end_matches('/').is_empty() {
                tracing::warn!(entry = %name, reason = %e, "Skipping unsafe archive entry");
                report.skipped.push(name.to_string());
            }
            None
        }
    }
}

/// Stream one entry to disk, metering bytes as they are written.
fn write_entry<R: Read>(
    reader: &mut R,
    dest: &Path,
    rel: &str,
    meter: &mut QuotaMeter,
    report: &mut ExtractionReport,
    cancel: &CancellationToken,
) -> IngestResult<()> {
    let target = dest.join(rel);

    if let Some(parent) = target.parent() {
        if fs::create_dir_all(parent).is_err() {
            return Err(IngestError::CorruptArchive(format!(
                "entry {} conflicts with another entry",
                rel
            )));
        }
    }

    let mut out = match OpenOptions::new().write(true).create_new(true).open(&target) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::warn!(entry = %rel, "Skipping duplicate archive entry");
            report.skipped.push(rel.to_string());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    meter.add_file()?;

    let mut buf = vec![0u8; COPY_BUFFER];
    loop {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        let n = reader
            .read(&mut buf)
            .map_err(|e| corrupt("failed to read entry", format!("{}: {}", rel, e)))?;
        if n == 0 {
            break;
        }
        meter.add_bytes(n as u64)?;
        out.write_all(&buf[..n])?;
    }

    Ok(())
}

fn extract_zip(
    data: &[u8],
    dest: &Path,
    quota: &Quota,
    meter: &mut QuotaMeter,
    report: &mut ExtractionReport,
    cancel: &CancellationToken,
) -> IngestResult<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| corrupt("unreadable zip archive", e))?;

    // Reject on declared totals before writing anything
    let mut declared_bytes = 0u64;
    let mut declared_files = 0usize;
    for i in 0..archive.len() {
        let file = archive
            .by_index_raw(i)
            .map_err(|e| corrupt("unreadable zip entry", format!("#{}: {}", i, e)))?;
        if !file.is_dir() {
            declared_files += 1;
            declared_bytes = declared_bytes.saturating_add(file.size());
        }
    }
    quota.check_totals(declared_bytes, declared_files)?;

    for i in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let mut file = archive
            .by_index(i)
            .map_err(|e| corrupt("unreadable zip entry", format!("#{}: {}", i, e)))?;
        let name = file.name().to_string();

        let Some(rel) = safe_entry_path(&name, report) else {
            continue;
        };

        if file.is_dir() {
            fs::create_dir_all(dest.join(&rel))?;
            continue;
        }

        if file
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            tracing::warn!(entry = %name, "Skipping symlink archive entry");
            report.skipped.push(name);
            continue;
        }

        write_entry(&mut file, dest, &rel, meter, report, cancel)?;
    }

    Ok(())
}

fn extract_tar<R: Read>(
    reader: R,
    dest: &Path,
    meter: &mut QuotaMeter,
    report: &mut ExtractionReport,
    cancel: &CancellationToken,
) -> IngestResult<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| corrupt("unreadable tar archive", e))?;

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let mut entry =
            entry.map_err(|e| corrupt("unreadable tar entry", e))?;
        let name = entry
            .path()
            .map_err(|e| corrupt("invalid tar entry name", e))?
            .to_string_lossy()
            .into_owned();

        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            tracing::warn!(entry = %name, "Skipping link archive entry");
            report.skipped.push(name);
            continue;
        }

        if !(entry_type.is_dir() || entry_type.is_file() || entry_type.is_contiguous()) {
            // pax headers, device nodes, fifos
            continue;
        }

        let Some(rel) = safe_entry_path(&name, report) else {
            continue;
        };

        if entry_type.is_dir() {
            fs::create_dir_all(dest.join(&rel))?;
            continue;
        }

        write_entry(&mut entry, dest, &rel, meter, report, cancel)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            // set_path refuses "..", so write the raw name bytes
            let raw = &mut header.as_old_mut().name;
            raw[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn quota() -> Quota {
        Quota::new(1024 * 1024, 100)
    }

    #[test]
    fn test_zip_extracts_files() {
        let dir = tempdir().unwrap();
        let data = zip_bytes(&[("src/main.rs", b"fn main() {}"), ("README.md", b"# hi")]);

        let report = extract_archive(
            &data,
            ArchiveFormat::Zip,
            dir.path(),
            quota(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.files_written, 2);
        assert_eq!(
            fs::read(dir.path().join("src/main.rs")).unwrap(),
            b"fn main() {}"
        );
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_zip_traversal_entries_are_omitted() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        let data = zip_bytes(&[
            ("../../etc/passwd", b"root:x:0:0"),
            ("/abs/path.txt", b"abs"),
            ("ok.txt", b"ok"),
        ]);

        let report = extract_archive(
            &data,
            ArchiveFormat::Zip,
            &staging,
            quota(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.files_written, 1);
        assert!(staging.join("ok.txt").exists());
        assert!(!dir.path().join("etc").exists());
        assert!(report.skipped.contains(&"../../etc/passwd".to_string()));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
            let result = extract_archive(
                b"definitely not an archive, just some bytes",
                format,
                dir.path(),
                quota(),
                &CancellationToken::new(),
            );
            assert!(
                matches!(result, Err(IngestError::CorruptArchive(_))),
                "{format}"
            );
        }
    }

    #[test]
    fn test_truncated_zip_is_corrupt() {
        let dir = tempdir().unwrap();
        let mut data = zip_bytes(&[("a.txt", b"aaaaaaaaaaaaaaaaaaaaaaaaaaaa")]);
        data.truncate(data.len() / 2);
        let result = extract_archive(
            &data,
            ArchiveFormat::Zip,
            dir.path(),
            quota(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(IngestError::CorruptArchive(_))));
    }

    #[test]
    fn test_zip_quota_checked_before_extraction() {
        let dir = tempdir().unwrap();
        let data = zip_bytes(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")]);
        let result = extract_archive(
            &data,
            ArchiveFormat::Zip,
            dir.path(),
            Quota::new(1024, 2),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(IngestError::QuotaExceeded(_))));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_tar_gz_extracts_and_meters_bytes() {
        let dir = tempdir().unwrap();
        let tar = tar_bytes(&[("pkg/lib.py", b"print('x')"), ("../escape.txt", b"nope")]);
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&tar).unwrap();
        let data = gz.finish().unwrap();

        let staging = dir.path().join("staging");
        let report = extract_archive(
            &data,
            ArchiveFormat::TarGz,
            &staging,
            quota(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(report.files_written, 1);
        assert_eq!(report.bytes_written, 10);
        assert!(staging.join("pkg/lib.py").exists());
        assert!(!dir.path().join("escape.txt").exists());

        let small = extract_archive(
            &data,
            ArchiveFormat::TarGz,
            &dir.path().join("small"),
            Quota::new(4, 100),
            &CancellationToken::new(),
        );
        assert!(matches!(small, Err(IngestError::QuotaExceeded(_))));
    }
}
