//! Upload: stream a remote URL or local file into the disk

use crate::client::DiskClient;
use crate::command::{UploadCommand, UploadSource};
use crate::gateway::Gateway;
use crate::links::{is_share_page, resolve_public_link, LinkResolution};
use crate::response::{GatewayResult, UploadData};
use crate::{Error, Result};
use diskgate_transfer::TransferAdapter;
use tracing::{debug, info, warn};

/// Some file hosts refuse HEAD, which says nothing about GET
const HEAD_NOT_ALLOWED: u16 = 405;

pub(crate) fn run(gateway: &Gateway, cmd: UploadCommand) -> Result<GatewayResult> {
    let client = gateway.client(Some(cmd.token.as_str()))?;

    let source = match cmd.source {
        UploadSource::Url(url) => UploadSource::Url(direct_source_url(gateway, &client, &url)?),
        file => file,
    };

    let href = client
        .upload_link(&cmd.disk_path, cmd.overwrite)
        .map_err(|e| e.context("Could not get an upload link"))?;
    debug!("Upload link for {} received", cmd.disk_path);

    let options = gateway.transfer_options("Uploading", &cmd.flags);
    let adapter = match &source {
        UploadSource::Url(url) => TransferAdapter::from_result(client.open_stream(url, 0), options),
        UploadSource::File(path) => TransferAdapter::open_file(path, options),
    };

    let file_size = stream_upload(&client, &href, adapter)?;
    info!("Uploaded {} bytes to {}", file_size, cmd.disk_path);

    let file_url = resolve_public_link(&client, &cmd.disk_path).or_path(&cmd.disk_path);
    Ok(GatewayResult::success(
        "File uploaded successfully",
        &UploadData {
            disk_path: cmd.disk_path,
            file_size,
            file_url,
        },
    ))
}

/// URL to stream from: share pages go through the direct link resolver,
/// anything else must answer HEAD without an error status
fn direct_source_url(gateway: &Gateway, client: &DiskClient, url: &str) -> Result<String> {
    if is_share_page(url) {
        return match gateway.resolver().resolve(url) {
            LinkResolution::Resolved(direct) => {
                debug!("Share page resolved to a direct link");
                Ok(direct)
            }
            LinkResolution::Unresolved => Err(Error::Source(
                "Could not get a direct file link from the share page, pass a direct download URL"
                    .to_string(),
            )),
        };
    }

    // Network failures keep their transport class
    let status = client.probe(url).map_err(|e| {
        warn!("Could not check the file URL {}: {}", url, e);
        e
    })?;
    match status {
        HEAD_NOT_ALLOWED => {
            warn!("{} does not allow HEAD, trying GET directly", url);
            Ok(url.to_string())
        }
        status if status >= 400 => Err(Error::Source(format!(
            "File URL is not reachable (HTTP {})",
            status
        ))),
        _ => Ok(url.to_string()),
    }
}

/// PUT the adapter's bytes to `href` and return how many were sent.
///
/// A failed adapter is closed without any request. Otherwise the adapter
/// is closed once the PUT returns, whatever its outcome.
pub fn stream_upload(client: &DiskClient, href: &str, mut adapter: TransferAdapter) -> Result<u64> {
    if adapter.has_error() {
        let message = adapter
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        adapter.close();
        return Err(Error::Source(format!(
            "Could not read the upload source: {}",
            message
        )));
    }

    let transfer = adapter.share();
    let _guard = transfer.close_guard();
    debug!(
        "Streaming {:?} bytes in {} byte chunks",
        transfer.length(),
        transfer.chunk_size()
    );

    let sent = client.put_stream(href, transfer.clone());
    if let Some(message) = transfer.error_message() {
        return Err(Error::Source(format!("Upload source failed mid-stream: {}", message)));
    }
    sent.map_err(|e| e.context("Upload failed"))?;

    Ok(transfer.bytes_read())
}
