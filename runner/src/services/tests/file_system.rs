use std::path::PathBuf;

use assert_matches::assert_matches;
use tempfile::TempDir;

use super::common::touch;
use crate::core::classify;
use crate::error::RunnerError;
use crate::services::RealFileSystem;
use crate::traits::FileSystem;

#[tokio::test]
async fn test_walk_is_depth_first_and_sorted() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "test/b.js", "");
    touch(dir.path(), "test/a/c.txt", "");
    touch(dir.path(), "test/a/b_test.sol", "");
    touch(dir.path(), "test/a.js", "");

    let fs = RealFileSystem::with_base_dir(dir.path().to_path_buf());
    let root = dir.path().join("test");
    let files = fs.list_files(&root).await.unwrap();

    let relative: Vec<PathBuf> = files.iter().map(|p| p.strip_prefix(&root).unwrap().to_path_buf()).collect();
    assert_eq!(
        relative,
        vec![
            PathBuf::from("a/b_test.sol"),
            PathBuf::from("a/c.txt"),
            PathBuf::from("a.js"),
            PathBuf::from("b.js"),
        ]
    );

    let groups = classify(&files);
    assert_eq!(groups.script_files.len(), 2);
    assert_eq!(groups.contract_test_files.len(), 1);
}

#[tokio::test]
async fn test_file_root_yields_itself() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "token.js", "");

    let fs = RealFileSystem::new();
    let file = dir.path().join("token.js");
    assert_eq!(fs.list_files(&file).await.unwrap(), vec![file]);
}

#[tokio::test]
async fn test_missing_root_names_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let result = RealFileSystem::new().list_files(&missing).await;
    assert_matches!(&result, Err(RunnerError::InputError { path }) if *path == missing);

    let message = result.unwrap_err().to_string();
    assert!(message.starts_with("File \""));
    assert!(message.ends_with("\" doesn't exist or you don't have permission to it"));
}

#[tokio::test]
async fn test_remove_artifacts() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), ".embark/contracts/token_test.sol", "");
    touch(dir.path(), ".embark/remix_tests.sol", "");
    touch(dir.path(), ".embark/coverage.json", "{}");

    let fs = RealFileSystem::with_base_dir(dir.path().to_path_buf());
    fs.remove_artifacts().await.unwrap();

    assert!(!dir.path().join(".embark/contracts").exists());
    assert!(!dir.path().join(".embark/remix_tests.sol").exists());
    assert!(dir.path().join(".embark/coverage.json").exists());

    // Nothing left to remove is not an error
    fs.remove_artifacts().await.unwrap();
}
