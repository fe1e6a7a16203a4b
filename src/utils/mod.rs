use anyhow::{Context, Result};
use std::path::Path;

/// Create a directory and its parents if missing
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        tracing::debug!("Created directory {}", path.display());
    }
    Ok(())
}

/// Directory holding a `sqlite:` database file, if the URL points at one
pub fn sqlite_parent_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir("sqlite:./data/classbook.db"),
            Some(Path::new("./data"))
        );
        assert_eq!(
            sqlite_parent_dir("sqlite:///var/lib/app/db.sqlite?mode=rwc"),
            Some(Path::new("/var/lib/app"))
        );
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("sqlite:plain.db"), None);
        assert_eq!(sqlite_parent_dir("postgres://x"), None);
    }
}
