//! Raw gateway request as received from the caller

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Operation requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upload,
    Download,
    Rename,
    Delete,
    List,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Upload => "upload",
            Action::Download => "download",
            Action::Rename => "rename",
            Action::Delete => "delete",
            Action::List => "list",
        }
    }

    /// Actions that only work on the caller's own disk
    pub fn requires_token(&self) -> bool {
        !matches!(self, Action::Download)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "upload" => Ok(Action::Upload),
            "download" => Ok(Action::Download),
            "rename" => Ok(Action::Rename),
            "delete" => Ok(Action::Delete),
            "list" => Ok(Action::List),
            _ => Err(Error::Validation(format!("Unknown action: {}", s))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped request mapping. Every field is optional here, the per-action
/// requirements are checked by [`Request::validate`](crate::Request::validate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    pub action: Option<String>,
    pub oauth_token: Option<String>,
    pub disk_path: Option<String>,
    pub new_name: Option<String>,
    pub file_url: Option<String>,
    pub local_path: Option<PathBuf>,
    pub public_key: Option<String>,
    pub public_path: Option<String>,
    pub overwrite: Option<bool>,
    pub show_progress: Option<bool>,
    #[serde(deserialize_with = "lenient_int")]
    pub chunk_size: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub offset: Option<i64>,
    pub resume: Option<bool>,
    pub permanently: Option<bool>,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self {
            action: Some(action.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Parse a request from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Validation(format!("Invalid request: {}", e)))
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.oauth_token = Some(token.into());
        self
    }

    pub fn with_disk_path(mut self, path: impl Into<String>) -> Self {
        self.disk_path = Some(path.into());
        self
    }
}

/// Integer given as a JSON number or a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<NumberLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberLike::Int(n)) => Ok(Some(n)),
        Some(NumberLike::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
        Some(NumberLike::Float(f)) => Err(D::Error::custom(format!("expected an integer, got {}", f))),
        Some(NumberLike::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberLike::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got \"{}\"", s))),
    }
}
