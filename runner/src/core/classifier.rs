//! Test file classification

use std::path::{Path, PathBuf};

const SCRIPT_SUFFIX: &str = ".js";
const CONTRACT_TEST_SUFFIX: &str = "_test.sol";

/// Discovered files split by the engine that runs them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFileSet {
    pub script_files: Vec<PathBuf>,
    pub contract_test_files: Vec<PathBuf>,
}

impl TestFileSet {
    pub fn is_empty(&self) -> bool {
        self.script_files.is_empty() && self.contract_test_files.is_empty()
    }
}

/// Partition paths by suffix, keeping their order; anything else is dropped
pub fn classify<P: AsRef<Path>>(paths: &[P]) -> TestFileSet {
    let mut set = TestFileSet::default();
    for path in paths {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        if name.ends_with(SCRIPT_SUFFIX) {
            set.script_files.push(path.to_path_buf());
        } else if name.ends_with(CONTRACT_TEST_SUFFIX) {
            set.contract_test_files.push(path.to_path_buf());
        }
    }
    set
}
