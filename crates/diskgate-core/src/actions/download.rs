//! Download: obtain a signed link and optionally stream the file to disk

use crate::client::DiskClient;
use crate::command::{DownloadCommand, DownloadTarget};
use crate::environment::Environment;
use crate::gateway::Gateway;
use crate::links::{resolve_public_link, LinkResolution};
use crate::paths;
use crate::response::{DownloadData, DownloadMethod, GatewayResult};
use crate::{Error, Result};
use chrono::Local;
use diskgate_transfer::{TransferAdapter, TransferError, TransferOptions};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LINK_ATTEMPTS: u32 = 3;
const EXPIRES_NOTE: &str = "The link is valid for a limited time, usually a few hours";
const RANGE_NOT_SATISFIABLE: u16 = 416;

struct FoundLink {
    url: String,
    method: DownloadMethod,
}

/// Bytes saved by one download to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    /// Bytes written by this call
    pub bytes_written: u64,
    /// Bytes already on disk that were kept
    pub resumed_from: u64,
}

impl SavedFile {
    pub fn total(&self) -> u64 {
        self.resumed_from + self.bytes_written
    }
}

pub(crate) fn run(gateway: &Gateway, cmd: DownloadCommand) -> Result<GatewayResult> {
    let environment = gateway.environment();

    let (client, link, file_size) = match &cmd.target {
        DownloadTarget::Private { token, disk_path } => {
            let client = gateway.client(Some(token.as_str()))?;
            let resource = client
                .resource(disk_path)
                .map_err(|e| e.context("File not found"))?;
            let link = find_download_link(&client, disk_path, environment)?;
            (client, link, resource.size)
        }
        DownloadTarget::Public {
            public_key,
            public_path,
        } => {
            let client = gateway.client(None)?;
            let url = client.public_download_link(public_key, public_path.as_deref())?;
            let link = FoundLink {
                url,
                method: DownloadMethod::Public,
            };
            (client, link, None)
        }
    };

    let (disk_path, public_key, public_path) = match &cmd.target {
        DownloadTarget::Private { disk_path, .. } => (Some(disk_path.clone()), None, None),
        DownloadTarget::Public {
            public_key,
            public_path,
        } => (None, Some(public_key.clone()), public_path.clone()),
    };

    let mut data = DownloadData {
        download_url: link.url.clone(),
        file_size,
        download_method: link.method,
        environment,
        expires_in: EXPIRES_NOTE.to_string(),
        disk_path,
        public_key,
        public_path,
        local_path: None,
        bytes_written: None,
        resumed_from: None,
    };

    let destination = match &cmd.local_path {
        Some(path) => Some(path.clone()),
        None => cache_destination(gateway, &cmd.target),
    };

    let Some(destination) = destination else {
        return Ok(GatewayResult::success("Download link received", &data));
    };

    let options = gateway.transfer_options("Downloading", &cmd.flags);
    let saved = save_to_file(&client, &link.url, &destination, cmd.resume, file_size, options)?;
    let message = format!("File saved to {}", saved.path.display());

    data.file_size = Some(saved.total());
    data.bytes_written = Some(saved.bytes_written);
    data.resumed_from = Some(saved.resumed_from);
    data.local_path = Some(saved.path);

    Ok(GatewayResult::success(message, &data))
}

/// Ask for a direct link a few times, checking each one with HEAD outside
/// Colab, then fall back to the resource's public link
fn find_download_link(
    client: &DiskClient,
    disk_path: &str,
    environment: Environment,
) -> Result<FoundLink> {
    for attempt in 1..=LINK_ATTEMPTS {
        debug!("Requesting a download link ({}/{})", attempt, LINK_ATTEMPTS);
        let href = match client.download_link(disk_path) {
            Ok(href) => href,
            Err(e) => {
                warn!("Could not get a download link: {}", e);
                continue;
            }
        };

        if environment.is_colab() {
            return Ok(FoundLink {
                url: with_attachment(&href),
                method: DownloadMethod::Direct,
            });
        }

        match client.probe(&href) {
            Ok(status) if status < 400 => {
                return Ok(FoundLink {
                    url: href,
                    method: DownloadMethod::Direct,
                })
            }
            Ok(status) => warn!("Download link answered HTTP {}, asking again", status),
            Err(e) => warn!("Could not check the download link: {}", e),
        }
    }

    info!("No working direct link for {}, trying its public link", disk_path);
    match resolve_public_link(client, disk_path) {
        LinkResolution::Resolved(url) => Ok(FoundLink {
            url,
            method: DownloadMethod::PublicLink,
        }),
        LinkResolution::Unresolved => Err(Error::Unavailable(
            "Could not get a working download link, try a public link or check access to the file"
                .to_string(),
        )),
    }
}

/// Append `disposition=attachment` to a link's query
pub fn with_attachment(href: &str) -> String {
    let separator = if href.contains('?') { '&' } else { '?' };
    format!("{}{}disposition=attachment", href, separator)
}

/// Cache file for hosts that keep downloads locally
fn cache_destination(gateway: &Gateway, target: &DownloadTarget) -> Option<PathBuf> {
    let environment = gateway.environment();
    if !environment.is_colab() {
        return None;
    }
    let dir = gateway
        .config()
        .transfer
        .cache_dir
        .clone()
        .or_else(|| environment.default_cache_dir())?;

    let name = match target {
        DownloadTarget::Private { disk_path, .. } => paths::file_name(disk_path),
        DownloadTarget::Public { public_path, .. } => {
            public_path.as_deref().and_then(paths::file_name)
        }
    };
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("download_{}", Local::now().format("%Y%m%d_%H%M%S")));
    Some(dir.join(name))
}

/// Stream `url` into `destination`.
///
/// With `resume` the bytes already on disk are kept and only the rest is
/// requested. A server that ignores the range gets the file truncated and
/// written from the start. A 416 answer means the file is already complete.
pub fn save_to_file(
    client: &DiskClient,
    url: &str,
    destination: &Path,
    resume: bool,
    expected_size: Option<u64>,
    options: TransferOptions,
) -> Result<SavedFile> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut existing = if resume {
        fs::metadata(destination).map(|m| m.len()).unwrap_or(0)
    } else {
        0
    };
    if expected_size.is_some_and(|size| existing > size) {
        warn!(
            "{} is larger than the remote file, downloading it again",
            destination.display()
        );
        existing = 0;
    }

    let source = match client.open_stream(url, existing) {
        Ok(source) => source,
        Err(TransferError::Status { status, .. })
            if status == RANGE_NOT_SATISFIABLE && existing > 0 =>
        {
            if expected_size.is_some_and(|size| existing < size) {
                return Err(Error::Source(format!(
                    "Server rejected resuming at byte {} of {:?}",
                    existing, expected_size
                )));
            }
            info!("{} is already complete", destination.display());
            return Ok(SavedFile {
                path: destination.to_path_buf(),
                bytes_written: 0,
                resumed_from: existing,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let offset = if existing > 0 && source.status() == 206 {
        match source.range_start() {
            Some(start) if start == existing => existing,
            other => {
                return Err(Error::Source(format!(
                    "Server returned a range starting at {:?}, expected {}",
                    other, existing
                )))
            }
        }
    } else {
        if existing > 0 {
            warn!("Server ignored the range request, downloading from the start");
        }
        0
    };

    let mut file = if offset > 0 {
        info!("Resuming {} from byte {}", destination.display(), offset);
        OpenOptions::new().append(true).open(destination)?
    } else {
        File::create(destination)?
    };

    let mut adapter = TransferAdapter::new(source, options.with_resume_offset(offset));
    let copied = adapter.copy_to(&mut file);
    adapter.close();
    let bytes_written = copied?;
    file.flush()?;

    debug!(
        "Wrote {} bytes to {}",
        bytes_written,
        destination.display()
    );
    Ok(SavedFile {
        path: destination.to_path_buf(),
        bytes_written,
        resumed_from: offset,
    })
}
