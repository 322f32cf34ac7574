use std::path::{Path, PathBuf};

use packmirror_fs::AtomicWriteOptions;
use url::Url;

/// Where a raw copy of `url` goes under `data_dir`: the URL path, with
/// empty and dot segments dropped so nothing escapes the directory.
pub(crate) fn dump_path(data_dir: &Path, url: &str) -> Option<PathBuf> {
    let url = Url::parse(url).ok()?;
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.iter().fold(data_dir.to_path_buf(), |path, s| path.join(s)))
}

/// Best-effort raw copy of a fetched document. Never fails the caller.
pub(crate) fn dump(data_dir: &Path, url: &str, body: &[u8]) {
    let Some(path) = dump_path(data_dir, url) else {
        tracing::warn!(url, "cannot derive dump path");
        return;
    };
    if let Err(e) = packmirror_fs::atomic_write(&path, body, AtomicWriteOptions::default()) {
        tracing::warn!(url, path = %path.display(), error = %e, "dump failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_path_follows_url_path() {
        let path = dump_path(Path::new("/data"), "https://repo.example/p2/acme/widget.json").unwrap();
        assert_eq!(path, Path::new("/data/p2/acme/widget.json"));

        let path = dump_path(Path::new("/data"), "https://repo.example/p/acme/widget$ab12.json").unwrap();
        assert_eq!(path, Path::new("/data/p/acme/widget$ab12.json"));
    }

    #[test]
    fn test_dump_path_stays_inside_data_dir() {
        let path = dump_path(Path::new("/data"), "https://repo.example/../../etc/passwd").unwrap();
        assert!(path.starts_with("/data"));
        assert_eq!(path, Path::new("/data/etc/passwd"));
    }

    #[test]
    fn test_dump_path_needs_a_path() {
        assert!(dump_path(Path::new("/data"), "https://repo.example/").is_none());
        assert!(dump_path(Path::new("/data"), "not a url").is_none());
    }
}
