//! Testing utilities and fixtures for diskgate
//!
//! This crate provides common testing utilities, fixtures, and helpers
//! for testing the gateway against a mocked provider.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod helpers;

/// Token that passes request validation
pub const TEST_TOKEN: &str = "AQAAAAA-test-token-0123456789";

/// Creates a temporary test directory with cleanup on drop
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path inside the directory, without creating anything
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a file with the given name and content in the test directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Creates a file of `size` patterned bytes and returns its path and content
    pub fn create_payload(&self, name: &str, size: usize) -> Result<(PathBuf, Vec<u8>)> {
        let content = fixtures::patterned(size);
        let path = self.create_file(name, &content)?;
        Ok((path, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_dir() {
        let test_dir = TestDir::new().unwrap();
        assert!(test_dir.path().exists());
    }

    #[test]
    fn test_create_file() {
        let test_dir = TestDir::new().unwrap();
        let file_path = test_dir.create_file("nested/test.txt", b"Hello, World!").unwrap();
        assert!(file_path.exists());
        assert_eq!(std::fs::read(&file_path).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_create_payload() {
        let test_dir = TestDir::new().unwrap();
        let (path, content) = test_dir.create_payload("blob.bin", 1000).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), content);
        assert_eq!(content[257], 1);
    }
}
