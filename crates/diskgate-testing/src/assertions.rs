//! Common assertions for diskgate testing

use anyhow::Result;
use diskgate_core::{FailureKind, GatewayResult};
use std::path::Path;

/// Asserts that the call succeeded and returns its payload
pub fn assert_ok(result: &GatewayResult) -> &serde_json::Value {
    assert!(result.ok, "expected success, got failure: {}", result.message);
    result
        .data
        .as_ref()
        .unwrap_or_else(|| panic!("successful result without data: {}", result.message))
}

/// Asserts that the call failed with the given class
pub fn assert_failed(result: &GatewayResult, kind: FailureKind) {
    assert!(!result.ok, "expected failure, got success: {}", result.message);
    assert_eq!(
        result.failure_kind(),
        Some(kind),
        "unexpected failure class for: {}",
        result.message
    );
    assert!(result.data.is_none(), "failure carries data");
}

/// Asserts that the result message contains `needle`
pub fn assert_message_contains(result: &GatewayResult, needle: &str) {
    assert!(
        result.message.contains(needle),
        "message {:?} does not contain {:?}",
        result.message,
        needle
    );
}

/// Asserts that a file holds exactly `expected`
pub fn assert_file_bytes(path: &Path, expected: &[u8]) -> Result<()> {
    let content = std::fs::read(path)?;
    assert_eq!(content.len(), expected.len(), "size mismatch for {:?}", path);
    assert!(content == expected, "content mismatch for {:?}", path);
    Ok(())
}
