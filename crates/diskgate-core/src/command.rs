//! Validated, typed form of a request
//!
//! Validation never touches the network. A request that passes carries
//! normalized disk paths and every default filled in.

use crate::config::{ListConfig, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::paths::normalize_disk_path;
use crate::request::{Action, Request};
use crate::{Error, Result};
use std::path::PathBuf;
use tracing::warn;

const MIN_TOKEN_LEN: usize = 10;
const MAX_URL_LEN: usize = 2048;
const MAX_NAME_LEN: usize = 255;

const TOKEN_FORBIDDEN: &[char] = &['<', '>', '"', '\'', '&', '\0', '\n', '\r'];
const PATH_FORBIDDEN: &[char] = &['<', '>', '"', '|', '?', '*'];
const URL_FORBIDDEN: &[char] = &['<', '>', '"', '\'', '\0', '\n', '\r'];
const NAME_FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*', '/', '\\'];

/// Streaming options shared by upload and download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFlags {
    pub show_progress: bool,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCommand {
    pub token: String,
    pub disk_path: String,
    pub source: UploadSource,
    pub overwrite: bool,
    pub flags: TransferFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// A file on the caller's disk
    Private { token: String, disk_path: String },
    /// A published resource, optionally a file inside a public folder
    Public {
        public_key: String,
        public_path: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCommand {
    pub target: DownloadTarget,
    pub local_path: Option<PathBuf>,
    pub resume: bool,
    pub flags: TransferFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCommand {
    pub token: String,
    pub disk_path: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCommand {
    pub token: String,
    pub disk_path: String,
    pub permanently: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCommand {
    pub token: String,
    pub disk_path: String,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(UploadCommand),
    Download(DownloadCommand),
    Rename(RenameCommand),
    Delete(DeleteCommand),
    List(ListCommand),
}

impl Command {
    pub fn action(&self) -> Action {
        match self {
            Command::Upload(_) => Action::Upload,
            Command::Download(_) => Action::Download,
            Command::Rename(_) => Action::Rename,
            Command::Delete(_) => Action::Delete,
            Command::List(_) => Action::List,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Validation(message.into())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_token(token: &str) -> Result<()> {
    if token.chars().count() < MIN_TOKEN_LEN {
        return Err(invalid("oauth_token is too short"));
    }
    if token.contains(TOKEN_FORBIDDEN) {
        return Err(invalid("oauth_token contains invalid characters"));
    }
    Ok(())
}

fn check_disk_path(path: &str) -> Result<()> {
    if path.contains(PATH_FORBIDDEN) {
        return Err(invalid("disk_path contains invalid characters: < > \" | ? *"));
    }
    Ok(())
}

fn check_file_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("file_url must start with http:// or https://"));
    }
    if url.chars().count() > MAX_URL_LEN {
        return Err(invalid("file_url is too long (at most 2048 characters)"));
    }
    if url.contains(URL_FORBIDDEN) {
        return Err(invalid("file_url contains invalid characters"));
    }
    Ok(())
}

fn check_new_name(name: &str) -> Result<()> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("new_name is too long (at most 255 characters)"));
    }
    if name.contains(NAME_FORBIDDEN) {
        return Err(invalid(
            "new_name contains invalid characters: < > : \" | ? * / \\",
        ));
    }
    Ok(())
}

impl Request {
    /// Validate and normalize the request into a [`Command`]
    pub fn validate(&self, list: &ListConfig) -> Result<Command> {
        let action: Action = non_empty(&self.action)
            .ok_or_else(|| invalid("action is required"))?
            .parse()?;

        let token = non_empty(&self.oauth_token);
        if action.requires_token() {
            let token = token
                .ok_or_else(|| invalid(format!("Action '{}' requires oauth_token", action)))?;
            check_token(token)?;
        } else if let Some(token) = token {
            check_token(token)?;
        }

        let disk_path = non_empty(&self.disk_path);
        if action.requires_token() && disk_path.is_none() {
            return Err(invalid(format!("Action '{}' requires disk_path", action)));
        }
        if let Some(path) = disk_path {
            check_disk_path(path)?;
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(invalid("offset cannot be negative"));
        }

        let chunk_size = match self.chunk_size {
            Some(size) if !(MIN_CHUNK_SIZE as i64..=MAX_CHUNK_SIZE as i64).contains(&size) => {
                return Err(invalid("chunk_size must be between 1024 and 10485760 bytes"));
            }
            Some(size) => Some(size as usize),
            None => None,
        };
        let flags = TransferFlags {
            show_progress: self.show_progress.unwrap_or(true),
            chunk_size,
        };

        // Presence of the token and path was checked above for these actions
        let owned = |value: Option<&str>| value.unwrap_or_default().to_string();

        let command = match action {
            Action::Upload => Command::Upload(UploadCommand {
                token: owned(token),
                disk_path: normalize_disk_path(&owned(disk_path)),
                source: self.upload_source()?,
                overwrite: self.overwrite.unwrap_or(true),
                flags,
            }),
            Action::Download => Command::Download(DownloadCommand {
                target: self.download_target(token, disk_path)?,
                local_path: self
                    .local_path
                    .clone()
                    .filter(|p| !p.as_os_str().is_empty()),
                resume: self.resume.unwrap_or(false),
                flags,
            }),
            Action::Rename => {
                let new_name = non_empty(&self.new_name)
                    .ok_or_else(|| invalid("Action 'rename' requires new_name"))?;
                check_new_name(new_name)?;
                Command::Rename(RenameCommand {
                    token: owned(token),
                    disk_path: normalize_disk_path(&owned(disk_path)),
                    new_name: new_name.to_string(),
                })
            }
            Action::Delete => Command::Delete(DeleteCommand {
                token: owned(token),
                disk_path: normalize_disk_path(&owned(disk_path)),
                permanently: self.permanently.unwrap_or(true),
            }),
            Action::List => Command::List(ListCommand {
                token: owned(token),
                disk_path: normalize_disk_path(&owned(disk_path)),
                limit: self.list_limit(list),
                offset: offset as u64,
            }),
        };

        Ok(command)
    }

    fn upload_source(&self) -> Result<UploadSource> {
        let local_path = self
            .local_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());

        match (non_empty(&self.file_url), local_path) {
            (Some(_), Some(_)) => Err(invalid(
                "Specify either file_url or local_path for upload, not both",
            )),
            (Some(url), None) => {
                check_file_url(url)?;
                Ok(UploadSource::Url(url.to_string()))
            }
            (None, Some(path)) => Ok(UploadSource::File(path.clone())),
            (None, None) => Err(invalid("Action 'upload' requires file_url or local_path")),
        }
    }

    fn download_target(&self, token: Option<&str>, disk_path: Option<&str>) -> Result<DownloadTarget> {
        if let (Some(token), Some(path)) = (token, disk_path) {
            return Ok(DownloadTarget::Private {
                token: token.to_string(),
                disk_path: normalize_disk_path(path),
            });
        }
        if let Some(public_key) = non_empty(&self.public_key) {
            return Ok(DownloadTarget::Public {
                public_key: public_key.to_string(),
                public_path: non_empty(&self.public_path).map(str::to_string),
            });
        }
        Err(invalid(
            "Action 'download' requires oauth_token with disk_path, or public_key",
        ))
    }

    fn list_limit(&self, list: &ListConfig) -> u32 {
        let requested = self.limit.unwrap_or(i64::from(list.default_limit));
        let min = i64::from(list.min_limit);
        if requested < min {
            warn!("limit {} is below {}, using {}", requested, min, min);
            return list.min_limit;
        }
        requested.min(i64::from(u32::MAX)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOKEN: &str = "AQAAAAAtest-token";

    fn validate(value: serde_json::Value) -> Result<Command> {
        Request::from_value(value)?.validate(&ListConfig::default())
    }

    fn message(value: serde_json::Value) -> String {
        validate(value).unwrap_err().to_string()
    }

    #[test]
    fn test_action_required() {
        assert_eq!(message(json!({})), "action is required");
        assert_eq!(message(json!({"action": "copy"})), "Unknown action: copy");
    }

    #[test]
    fn test_token_rules() {
        assert!(message(json!({"action": "delete", "disk_path": "/a"})).contains("requires oauth_token"));
        assert_eq!(
            message(json!({"action": "delete", "disk_path": "/a", "oauth_token": "short"})),
            "oauth_token is too short"
        );
        assert_eq!(
            message(json!({"action": "delete", "disk_path": "/a", "oauth_token": "abcdefghij<k"})),
            "oauth_token contains invalid characters"
        );
    }

    #[test]
    fn test_disk_path_rules() {
        assert!(message(json!({"action": "list", "oauth_token": TOKEN})).contains("requires disk_path"));
        assert!(message(json!({"action": "list", "oauth_token": TOKEN, "disk_path": "/a?b"}))
            .contains("invalid characters"));
    }

    #[test]
    fn test_upload_url_rules() {
        let base = |url: &str| json!({"action": "upload", "oauth_token": TOKEN, "disk_path": "/a", "file_url": url});
        assert!(message(base("ftp://host/file")).contains("http:// or https://"));
        assert!(message(base(&format!("https://h/{}", "x".repeat(2048)))).contains("too long"));
        assert!(message(base("https://h/a'b")).contains("invalid characters"));
        assert!(message(json!({"action": "upload", "oauth_token": TOKEN, "disk_path": "/a"}))
            .contains("file_url or local_path"));
        assert!(message(json!({
            "action": "upload", "oauth_token": TOKEN, "disk_path": "/a",
            "file_url": "https://h/f", "local_path": "/tmp/f"
        }))
        .contains("not both"));
    }

    #[test]
    fn test_upload_command() {
        let command = validate(json!({
            "action": "upload",
            "oauth_token": TOKEN,
            "disk_path": "music/track.mp3",
            "file_url": "https://example.com/track.mp3",
            "chunk_size": "65536",
            "show_progress": false
        }))
        .unwrap();

        assert_eq!(
            command,
            Command::Upload(UploadCommand {
                token: TOKEN.to_string(),
                disk_path: "disk:/music/track.mp3".to_string(),
                source: UploadSource::Url("https://example.com/track.mp3".to_string()),
                overwrite: true,
                flags: TransferFlags {
                    show_progress: false,
                    chunk_size: Some(65536),
                },
            })
        );
    }

    #[test]
    fn test_rename_name_rules() {
        let base = |name: &str| json!({"action": "rename", "oauth_token": TOKEN, "disk_path": "/a", "new_name": name});
        assert!(message(base("a/b")).contains("invalid characters"));
        assert!(message(base(&"n".repeat(256))).contains("too long"));
        assert!(validate(base(&"n".repeat(255))).is_ok());
        assert!(message(json!({"action": "rename", "oauth_token": TOKEN, "disk_path": "/a"}))
            .contains("new_name"));
    }

    #[test]
    fn test_numeric_rules() {
        let list = |extra: serde_json::Value| {
            let mut value = json!({"action": "list", "oauth_token": TOKEN, "disk_path": "/"});
            for (k, v) in extra.as_object().unwrap() {
                value[k] = v.clone();
            }
            value
        };
        assert_eq!(message(list(json!({"offset": -1}))), "offset cannot be negative");
        assert!(message(list(json!({"chunk_size": 1023}))).contains("chunk_size"));
        assert!(message(list(json!({"chunk_size": 10 * 1024 * 1024 + 1}))).contains("chunk_size"));
        assert!(validate(list(json!({"chunk_size": 1024}))).is_ok());
    }

    #[test]
    fn test_list_limit_clamped() {
        let limit = |value: serde_json::Value| match validate(value).unwrap() {
            Command::List(cmd) => cmd.limit,
            other => panic!("unexpected command {:?}", other),
        };
        let base = json!({"action": "list", "oauth_token": TOKEN, "disk_path": "/"});
        assert_eq!(limit(base.clone()), 100);

        let mut small = base.clone();
        small["limit"] = json!(0);
        assert_eq!(limit(small), 10);

        let mut negative = base.clone();
        negative["limit"] = json!("-5");
        assert_eq!(limit(negative), 10);

        let mut fine = base;
        fine["limit"] = json!(25);
        assert_eq!(limit(fine), 25);
    }

    #[test]
    fn test_download_targets() {
        let command = validate(json!({"action": "download", "oauth_token": TOKEN, "disk_path": "/a.txt"})).unwrap();
        assert!(matches!(
            command,
            Command::Download(DownloadCommand { target: DownloadTarget::Private { ref disk_path, .. }, resume: false, .. })
                if disk_path == "disk:/a.txt"
        ));

        let command = validate(json!({"action": "download", "public_key": "https://yadi.sk/d/abc"})).unwrap();
        assert!(matches!(
            command,
            Command::Download(DownloadCommand { target: DownloadTarget::Public { public_path: None, .. }, .. })
        ));

        assert!(message(json!({"action": "download", "disk_path": "/a.txt"})).contains("public_key"));
    }
}
