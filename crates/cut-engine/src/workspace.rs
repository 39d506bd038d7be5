//! Scratch directory for extracted segments.

use std::fs;
use std::path::{Path, PathBuf};

use povtrim_common::error::{PovError, PovResult};

/// Hidden directory next to the output file holding per-segment files
/// and the concat list. Removed on drop unless kept.
#[derive(Debug)]
pub struct SegmentWorkspace {
    dir: PathBuf,
    extension: String,
    keep: bool,
}

impl SegmentWorkspace {
    pub fn create(output: &Path) -> PovResult<Self> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = output
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("povtrim");
        let extension = output
            .extension()
            .and_then(|value| value.to_str())
            .unwrap_or("mp4")
            .to_string();
        let unique_suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or(0);

        let dir = parent.join(format!(".{stem}_segments_{}_{unique_suffix}", std::process::id()));
        fs::create_dir_all(&dir).map_err(|e| {
            PovError::config(format!(
                "Failed to create segment workspace {}: {e}",
                dir.display()
            ))
        })?;
        tracing::debug!(dir = %dir.display(), "Created segment workspace");

        Ok(Self {
            dir,
            extension,
            keep: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Leave the directory in place when dropped (for debugging).
    pub fn keep(&mut self) {
        self.keep = true;
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("segment_{index:04}.{}", self.extension))
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.dir.join("segments.txt")
    }

    /// Concat target. Moved onto the output only once the join succeeded.
    pub fn joined_path(&self) -> PathBuf {
        self.dir.join(format!("joined.{}", self.extension))
    }

    /// Write the concat demuxer list for `segments`.
    pub fn write_concat_list(&self, segments: &[PathBuf]) -> PovResult<PathBuf> {
        let path = self.concat_list_path();
        let contents: String = segments.iter().map(|p| format_concat_entry(p)).collect();
        fs::write(&path, contents)?;
        Ok(path)
    }
}

impl Drop for SegmentWorkspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %err, "Failed to remove segment workspace");
        }
    }
}

/// One `file '…'` line of a concat list, with quotes escaped.
pub fn format_concat_entry(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let escaped = normalized.replace('\'', "'\\''");
    format!("file '{escaped}'\n")
}

/// Move a finished file into place, replacing any existing output.
pub fn move_into_place(from: &Path, to: &Path) -> PovResult<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_error) => {
            tracing::debug!(error = %rename_error, "Rename failed; copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("povtrim_ws_{tag}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_concat_entry_escapes_quotes() {
        assert_eq!(
            format_concat_entry(Path::new("/tmp/a/segment_0001.mp4")),
            "file '/tmp/a/segment_0001.mp4'\n"
        );
        assert_eq!(
            format_concat_entry(Path::new("/tmp/it's/seg.mp4")),
            "file '/tmp/it'\\''s/seg.mp4'\n"
        );
    }

    #[test]
    fn test_workspace_paths_and_cleanup() {
        let root = scratch("cleanup");
        let output = root.join("pov.mkv");
        let dir;
        {
            let ws = SegmentWorkspace::create(&output).unwrap();
            dir = ws.dir().to_path_buf();
            assert!(dir.is_dir());
            assert!(dir.starts_with(&root));
            assert_eq!(ws.segment_path(3).file_name().unwrap(), "segment_0003.mkv");

            let list = ws
                .write_concat_list(&[ws.segment_path(0), ws.segment_path(1)])
                .unwrap();
            let contents = fs::read_to_string(list).unwrap();
            assert_eq!(contents.lines().count(), 2);
        }
        assert!(!dir.exists());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_kept_workspace_survives_drop() {
        let root = scratch("keep");
        let dir;
        {
            let mut ws = SegmentWorkspace::create(&root.join("out.mp4")).unwrap();
            ws.keep();
            dir = ws.dir().to_path_buf();
        }
        assert!(dir.exists());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_move_into_place_replaces_existing() {
        let root = scratch("move");
        let from = root.join("segment.mp4");
        let to = root.join("final.mp4");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();
        move_into_place(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"new");
        assert!(!from.exists());
        fs::remove_dir_all(root).ok();
    }
}
