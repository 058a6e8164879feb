// ============================================================
// Layer 6 — Text Output
// ============================================================

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Write `text` to `path`, creating missing parent directories.
pub fn save_text(text: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote {} bytes to '{}'", text.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a/b/c.txt");
        save_text("hello", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.txt");
        save_text("first", &path).unwrap();
        save_text("second", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
