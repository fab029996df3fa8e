use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary policy directory; removed on drop
pub struct PolicyDir {
    dir: TempDir,
}

impl PolicyDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write `nodes` (already rendered KDL) into `file_name`.
    pub fn write(&self, file_name: &str, nodes: &[String]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, nodes.join("\n")).expect("Failed to write policy file");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
