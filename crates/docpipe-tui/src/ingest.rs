//! File ingestion funnel — gathers candidate documents from the browser
//! pane, from paths pasted/dropped into the terminal, and from the system
//! clipboard, filtered to the accepted document types.
//!
//! The funnel only appends; it never replaces or deduplicates by name
//! (distinct documents may legitimately share a filename).

use std::path::{Path, PathBuf};

/// Accepted document types, by extension.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// MIME type for the multipart upload part.
pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// An entry of the file browser pane.
#[derive(Debug, Clone)]
pub struct BrowseEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub is_dir: bool,
}

/// List a directory for the browser: subdirectories first, then accepted
/// document files, both name-sorted. Unreadable directories list empty.
pub fn scan_dir(dir: &Path) -> Vec<BrowseEntry> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if meta.is_dir() {
            dirs.push(BrowseEntry {
                path,
                name,
                size_bytes: 0,
                is_dir: true,
            });
        } else if accepts(&path) {
            files.push(BrowseEntry {
                path,
                name,
                size_bytes: meta.len(),
                is_dir: false,
            });
        }
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));
    dirs.extend(files);
    dirs
}

/// Extract candidate paths from pasted text (clipboard or terminal paste).
/// Handles one path per line, surrounding quotes, and `file://` prefixes;
/// keeps only existing files of an accepted type.
pub fn paths_from_paste(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(|line| line.trim().trim_matches('"').trim_matches('\''))
        .filter(|s| !s.is_empty())
        .map(|s| s.strip_prefix("file://").unwrap_or(s))
        .map(PathBuf::from)
        .filter(|p| accepts(p) && p.is_file())
        .collect()
}

pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Human-readable size for list rows.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_document_types_case_insensitively() {
        assert!(accepts(Path::new("report.pdf")));
        assert!(accepts(Path::new("scan.PNG")));
        assert!(accepts(Path::new("photo.JpEg")));
        assert!(!accepts(Path::new("notes.txt")));
        assert!(!accepts(Path::new("archive.zip")));
        assert!(!accepts(Path::new("no_extension")));
    }

    #[test]
    fn mime_matches_extension() {
        assert_eq!(mime_for(Path::new("a.pdf")), "application/pdf");
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
    }

    #[test]
    fn scan_dir_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".hidden.pdf"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = scan_dir(dir.path());
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "a.png", "b.pdf"]);
        assert!(entries[0].is_dir);
    }

    #[test]
    fn paste_extracts_existing_accepted_files() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("report.pdf");
        std::fs::write(&pdf, b"x").unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"x").unwrap();

        let text = format!(
            "\"{}\"\n{}\n/does/not/exist.pdf\n",
            pdf.display(),
            txt.display()
        );
        let paths = paths_from_paste(&text);
        assert_eq!(paths, vec![pdf]);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
