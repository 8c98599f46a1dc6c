//! Common test fixtures for diskgate testing

use crate::TEST_TOKEN;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde_json::{json, Value};

/// Bytes 0..=255 repeated, so offsets are easy to check
pub fn patterned(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Reproducible random bytes
pub fn random_payload(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size];
    rng.fill_bytes(&mut data);
    data
}

pub fn upload_url_request(disk_path: &str, file_url: &str) -> Value {
    json!({
        "action": "upload",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path,
        "file_url": file_url,
        "show_progress": false
    })
}

pub fn upload_file_request(disk_path: &str, local_path: &std::path::Path) -> Value {
    json!({
        "action": "upload",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path,
        "local_path": local_path,
        "show_progress": false
    })
}

pub fn download_request(disk_path: &str) -> Value {
    json!({
        "action": "download",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path,
        "show_progress": false
    })
}

pub fn rename_request(disk_path: &str, new_name: &str) -> Value {
    json!({
        "action": "rename",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path,
        "new_name": new_name
    })
}

pub fn delete_request(disk_path: &str) -> Value {
    json!({
        "action": "delete",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path
    })
}

pub fn list_request(disk_path: &str, limit: Value) -> Value {
    json!({
        "action": "list",
        "oauth_token": TEST_TOKEN,
        "disk_path": disk_path,
        "limit": limit
    })
}
