//! Best-effort content classification of cataloged files

use std::path::Path;

use explainer_core::models::ContentCategory;

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "pyi", "js", "mjs", "cjs", "jsx", "ts", "tsx", "go", "java", "kt", "kts", "scala",
    "c", "h", "cc", "cpp", "cxx", "hpp", "hh", "cs", "fs", "swift", "m", "mm", "rb", "php", "pl",
    "pm", "lua", "r", "jl", "dart", "ex", "exs", "erl", "hrl", "clj", "cljs", "hs", "ml", "mli",
    "elm", "vue", "svelte", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "sql", "zig", "nim",
    "v", "sv", "vhd", "asm", "s", "groovy", "gradle", "proto", "graphql", "gql", "sol", "wasm",
];

const MARKUP_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "xml", "xsl", "svg", "css", "scss", "sass", "less", "jinja", "j2",
    "hbs", "mustache", "ejs", "erb", "twig", "tex",
];

const CONFIG_EXTENSIONS: &[&str] = &[
    "toml", "yaml", "yml", "ini", "cfg", "conf", "env", "properties", "editorconfig", "lock",
    "gitignore", "gitattributes", "dockerignore", "npmrc", "nvmrc",
];

const DATA_EXTENSIONS: &[&str] = &["json", "jsonl", "ndjson", "csv", "tsv", "parquet", "avro"];

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "adoc", "asciidoc", "txt", "org"];

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "ico", "tif", "tiff", "avif", "heic", "psd",
];

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a", "opus"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v", "wmv"];

const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war", "whl", "gem",
];

/// Extension-less file names with a well known meaning.
const WELL_KNOWN_NAMES: &[(&str, ContentCategory)] = &[
    ("makefile", ContentCategory::Source),
    ("dockerfile", ContentCategory::Source),
    ("rakefile", ContentCategory::Source),
    ("gemfile", ContentCategory::Config),
    ("procfile", ContentCategory::Config),
    ("license", ContentCategory::Document),
    ("copying", ContentCategory::Document),
    ("readme", ContentCategory::Document),
    ("changelog", ContentCategory::Document),
    ("authors", ContentCategory::Document),
];

/// Lower-cased extension of a path, if any. Dotfiles such as `.gitignore`
/// report the part after the leading dot.
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx + 1..],
        _ => return None,
    };
    Some(ext.to_lowercase())
}

/// Category implied by name or extension alone; `None` when the content must be sniffed.
pub fn category_from_name(path: &str) -> Option<ContentCategory> {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();

    if let Some((_, category)) = WELL_KNOWN_NAMES.iter().find(|(n, _)| *n == name) {
        return Some(*category);
    }

    let ext = extension_of(path)?;
    let ext = ext.as_str();
    let tables: [(&[&str], ContentCategory); 9] = [
        (SOURCE_EXTENSIONS, ContentCategory::Source),
        (MARKUP_EXTENSIONS, ContentCategory::Markup),
        (CONFIG_EXTENSIONS, ContentCategory::Config),
        (DATA_EXTENSIONS, ContentCategory::Data),
        (DOCUMENT_EXTENSIONS, ContentCategory::Document),
        (IMAGE_EXTENSIONS, ContentCategory::Image),
        (AUDIO_EXTENSIONS, ContentCategory::Audio),
        (VIDEO_EXTENSIONS, ContentCategory::Video),
        (ARCHIVE_EXTENSIONS, ContentCategory::Archive),
    ];
    tables
        .iter()
        .find(|(exts, _)| exts.contains(&ext))
        .map(|(_, category)| *category)
}

/// Text vs binary guess from the first bytes of a file.
pub fn sniff(head: &[u8]) -> ContentCategory {
    if head.contains(&0) {
        return ContentCategory::Binary;
    }
    match std::str::from_utf8(head) {
        Ok(_) => ContentCategory::Text,
        // A multi-byte character cut off by the sniff window is still text
        Err(e) if e.error_len().is_none() => ContentCategory::Text,
        Err(_) => ContentCategory::Binary,
    }
}

/// MIME type guess; falls back on the category when the extension is unknown.
pub fn mime_type(path: &str, category: ContentCategory) -> String {
    if let Some(mime) = mime_guess::from_path(Path::new(path)).first_raw() {
        return mime.to_string();
    }
    if category.is_textual() {
        "text/plain".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("src/main.RS").as_deref(), Some("rs"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of(".gitignore").as_deref(), Some("gitignore"));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("dir.d/file"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(category_from_name("src/lib.rs"), Some(ContentCategory::Source));
        assert_eq!(category_from_name("Cargo.toml"), Some(ContentCategory::Config));
        assert_eq!(category_from_name("README.md"), Some(ContentCategory::Document));
        assert_eq!(category_from_name("LICENSE"), Some(ContentCategory::Document));
        assert_eq!(category_from_name("logo.PNG"), Some(ContentCategory::Image));
        assert_eq!(category_from_name("data.csv"), Some(ContentCategory::Data));
        assert_eq!(category_from_name("index.html"), Some(ContentCategory::Markup));
        assert_eq!(category_from_name("blob.xyz"), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(b"plain words\n"), ContentCategory::Text);
        assert_eq!(sniff(b"\x7fELF\x02\x01\x00\x00"), ContentCategory::Binary);
        assert_eq!(sniff(&[0xff, 0xfe, 0xfd]), ContentCategory::Binary);
        // "é" is 0xC3 0xA9; a window ending after the first byte is still text
        assert_eq!(sniff(&[b'a', 0xc3]), ContentCategory::Text);
        assert_eq!(sniff(b""), ContentCategory::Text);
    }

    #[test]
    fn test_mime_type_fallbacks() {
        assert_eq!(mime_type("logo.png", ContentCategory::Image), "image/png");
        assert_eq!(mime_type("notes.zzz", ContentCategory::Text), "text/plain");
        assert_eq!(
            mime_type("blob.zzz", ContentCategory::Binary),
            "application/octet-stream"
        );
    }
}
