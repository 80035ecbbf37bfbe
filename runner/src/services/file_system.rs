//! Real file system service implementation
//!
//! Discovers test files and removes the transient `.embark` artifacts a
//! run leaves behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use shared::{ProcessId, process_debug};

use crate::error::{RunnerError, RunnerResult};
use crate::traits::FileSystem;

/// Artifacts removed after every run, relative to the project directory
pub const RUN_ARTIFACTS: [&str; 2] = [".embark/contracts", ".embark/remix_tests.sol"];

pub struct RealFileSystem {
    /// Project directory the artifacts live under
    base_dir: PathBuf,
}

impl RealFileSystem {
    /// Use the current directory as project directory
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Depth-first walk with entries visited in name order
    async fn walk(&self, root: &Path) -> RunnerResult<Vec<PathBuf>> {
        let input_error = || RunnerError::InputError { path: root.to_path_buf() };
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(path) = pending.pop() {
            let metadata = fs::metadata(&path).await.map_err(|_| input_error())?;
            if !metadata.is_dir() {
                files.push(path);
                continue;
            }

            let mut entries = fs::read_dir(&path).await.map_err(|_| input_error())?;
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(|_| input_error())? {
                children.push(entry.path());
            }
            children.sort();
            // Reversed so the smallest name is popped first
            pending.extend(children.into_iter().rev());
        }

        Ok(files)
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn list_files(&self, root: &Path) -> RunnerResult<Vec<PathBuf>> {
        let files = self.walk(root).await?;
        process_debug!(ProcessId::current(), "📂 {} files under {}", files.len(), root.display());
        Ok(files)
    }

    async fn remove_artifacts(&self) -> RunnerResult<()> {
        for artifact in RUN_ARTIFACTS {
            let path = self.base_dir.join(artifact);
            let removed = match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&path).await,
                Ok(_) => fs::remove_file(&path).await,
                Err(_) => continue,
            };
            removed?;
            process_debug!(ProcessId::current(), "🧹 Removed {}", path.display());
        }
        Ok(())
    }
}
