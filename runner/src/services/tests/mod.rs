//! Service-specific tests
//!
//! Tests for the real service implementations: discovery and cleanup on
//! disk, compiler and engine output parsing, and child-process suites.

#[cfg(test)]
mod file_system;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::path::Path;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    /// Create `relative` under `root` with its parent directories
    pub fn touch(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
