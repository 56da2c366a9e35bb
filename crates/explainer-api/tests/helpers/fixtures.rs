//! Archives and multipart forms used across the API tests.

use axum_test::multipart::{MultipartForm, Part};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::Command;
use zip::write::FileOptions;

/// A small source tree: two Rust files, a README and a nested config.
pub fn sample_files() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("README.md", b"# Sample\n\nGreets people.\n"),
        ("src/main.rs", b"mod greet;\nfn main() { greet::greet(); }\n"),
        ("src/greet.rs", b"pub fn greet() { println!(\"hi\"); }"),
        ("config/app.toml", b"name = \"sample\"\n"),
    ]
}

pub fn zip_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, data) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn sample_zip() -> Vec<u8> {
    zip_archive(&sample_files())
}

/// Gzip-compressed tar with the files under a single top-level directory,
/// the way release tarballs are usually laid out.
pub fn tar_gz_archive(prefix: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", prefix, name), *data)
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Multipart form with the archive in `file` and any extra text fields.
pub fn upload_form(archive: Vec<u8>, filename: &str, fields: &[(&str, &str)]) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(archive))
        .file_name(filename.to_string())
        .mime_type("application/zip");
    let mut form = MultipartForm::new();
    for (name, value) in fields {
        form = form.add_text(name.to_string(), value.to_string());
    }
    form.add_part("file", part)
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Create a git repository at `dir` with one commit containing `count` files
/// spread over a few directories.
pub fn init_git_repo(dir: &Path, count: usize) {
    for i in 0..count {
        let sub = match i % 3 {
            0 => "src",
            1 => "src/util",
            _ => "docs",
        };
        let path = dir.join(sub).join(format!("file{:02}.txt", i));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("file number {}\n", i)).unwrap();
    }

    let git = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    };
    git(&["init", "--quiet"]);
    git(&["add", "."]);
    git(&["commit", "--quiet", "-m", "initial"]);
}
