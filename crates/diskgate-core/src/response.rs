//! Uniform gateway result and per-action payloads

use crate::environment::Environment;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Class of a failed call, kept for callers and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected before any network call
    Validation,
    /// Connection or timeout failure
    Transport,
    /// Non-success provider answer
    Provider,
    /// Source or sink failure while streaming
    Transfer,
    /// Anything else
    Internal,
}

/// Result of one gateway call: `{ok, message, data?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResult {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip)]
    failure: Option<FailureKind>,
}

impl GatewayResult {
    /// Successful result carrying a serialized payload
    pub fn success<T: Serialize>(message: impl Into<String>, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                ok: true,
                message: message.into(),
                data: Some(value),
                failure: None,
            },
            Err(e) => Self::failure(FailureKind::Internal, format!("Failed to encode result: {}", e)),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: None,
            failure: Some(kind),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::failure(err.kind(), err.user_message())
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Failure class, `None` on success
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure
    }

    /// Payload field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(name))
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!(self)
    }
}

impl From<Error> for GatewayResult {
    fn from(err: Error) -> Self {
        Self::from_error(&err)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadData {
    pub disk_path: String,
    pub file_size: u64,
    pub file_url: String,
}

/// How the download link was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMethod {
    /// Signed link from the provider download endpoint
    Direct,
    /// Public link of the resource, used when no direct link worked
    PublicLink,
    /// Download by public key
    Public,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadData {
    pub download_url: String,
    pub file_size: Option<u64>,
    pub download_method: DownloadMethod,
    pub environment: Environment,
    pub expires_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameData {
    pub old_path: String,
    pub new_path: String,
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteData {
    pub disk_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListData {
    pub disk_path: String,
    pub items: Vec<ListItem>,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}
