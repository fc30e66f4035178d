//! Utility functions for output paths and file serving

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Name of a produced file relative to the download root, with `/` separators
///
/// Engines report absolute (or cwd-relative) paths; the task state stores them
/// relative to the download root. Paths outside the root fall back to their file
/// name.
///
/// # Examples
///
/// ```
/// use anymusic_dl::utils::relative_output_name;
/// use std::path::Path;
///
/// let name = relative_output_name(
///     Path::new("/srv/music"),
///     Path::new("/srv/music/Road Trip/Song.mp3"),
/// );
/// assert_eq!(name, "Road Trip/Song.mp3");
/// ```
pub fn relative_output_name(root: &Path, path: &Path) -> String {
    let relative = lexical(path)
        .strip_prefix(lexical(root))
        .map(Path::to_path_buf)
        .ok()
        .or_else(|| {
            let root = root.canonicalize().ok()?;
            let path = path.canonicalize().ok()?;
            path.strip_prefix(root).map(Path::to_path_buf).ok()
        });

    match relative {
        Some(relative) => join_with_slashes(&relative),
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| join_with_slashes(path)),
    }
}

/// Resolve a client-supplied relative name to a file below the download root
///
/// # Errors
///
/// - [`Error::InvalidInput`] when the name is empty, absolute, contains `..`, or
///   resolves (through symlinks) outside the root
/// - [`Error::NotFound`] when no such file exists
pub fn resolve_download_path(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if name.trim().is_empty() || escapes {
        return Err(Error::InvalidInput(format!("invalid file path: {}", name)));
    }

    let candidate = root.join(relative);
    if !candidate.is_file() {
        return Err(Error::NotFound(format!("file {}", name)));
    }

    let canonical_root = root.canonicalize()?;
    let canonical = candidate.canonicalize()?;
    if !canonical.starts_with(&canonical_root) {
        return Err(Error::InvalidInput(format!(
            "file path escapes the download directory: {}",
            name
        )));
    }
    Ok(canonical)
}

/// `Content-Disposition` header value that forces a download of `name`
///
/// Only the last path segment is used. The RFC 5987 `filename*` parameter carries
/// the exact UTF-8 name; `filename` carries an ASCII approximation for old clients.
pub fn content_disposition(name: &str) -> String {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Drop `.` components so `./downloads/a.mp3` and `downloads/a.mp3` compare equal
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn join_with_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_name_strips_root() {
        assert_eq!(
            relative_output_name(Path::new("/srv/music"), Path::new("/srv/music/Song.mp3")),
            "Song.mp3"
        );
    }

    #[test]
    fn relative_name_handles_cwd_relative_roots() {
        assert_eq!(
            relative_output_name(
                Path::new("./downloads"),
                Path::new("downloads/Mix/Track 1.mp3")
            ),
            "Mix/Track 1.mp3"
        );
    }

    #[test]
    fn relative_name_outside_root_falls_back_to_file_name() {
        assert_eq!(
            relative_output_name(Path::new("/srv/music"), Path::new("/tmp/other/Song.mp3")),
            "Song.mp3"
        );
    }

    #[test]
    fn resolve_finds_nested_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("List")).unwrap();
        std::fs::write(dir.path().join("List/Song.mp3"), b"ID3").unwrap();

        let resolved = resolve_download_path(dir.path(), "List/Song.mp3").unwrap();
        assert!(resolved.ends_with("List/Song.mp3"));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        for name in ["../etc/passwd", "List/../../secret", "/etc/passwd", ""] {
            assert!(
                matches!(
                    resolve_download_path(dir.path(), name),
                    Err(Error::InvalidInput(_))
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn resolve_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_download_path(dir.path(), "nope.mp3"),
            Err(Error::NotFound(_))
        ));
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        assert!(matches!(
            resolve_download_path(dir.path(), "folder"),
            Err(Error::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            root.path().join("link.mp3"),
        )
        .unwrap();

        assert!(matches!(
            resolve_download_path(root.path(), "link.mp3"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn content_disposition_encodes_utf8_names() {
        let header = content_disposition("Mix/Café \"Live\".mp3");
        assert_eq!(
            header,
            "attachment; filename=\"Caf_ _Live_.mp3\"; filename*=UTF-8''Caf%C3%A9%20%22Live%22.mp3"
        );
    }

    #[test]
    fn content_disposition_plain_ascii() {
        assert_eq!(
            content_disposition("Song.mp3"),
            "attachment; filename=\"Song.mp3\"; filename*=UTF-8''Song.mp3"
        );
    }
}
