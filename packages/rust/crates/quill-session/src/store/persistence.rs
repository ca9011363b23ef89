//! Atomic text writes for file-backed slots.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `content` to `path` so readers see either the old or the new file:
/// temp file in the same directory, fsync, rename.
pub(crate) fn atomic_write_text(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create slot directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("slot.json");
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let mut temp_file = std::fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temporary slot file {}", temp_path.display()))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("failed to write temporary slot file {}", temp_path.display()))?;
    temp_file
        .sync_all()
        .with_context(|| format!("failed to fsync temporary slot file {}", temp_path.display()))?;

    if let Err(error) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(error).with_context(|| {
            format!(
                "failed to move slot file {} into {}",
                temp_path.display(),
                path.display()
            )
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::atomic_write_text;

    #[test]
    fn overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/slot.json");
        atomic_write_text(&path, "[1]").unwrap();
        atomic_write_text(&path, "[1,2]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]");
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
