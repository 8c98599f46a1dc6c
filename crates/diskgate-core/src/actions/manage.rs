//! Rename and delete

use crate::command::{DeleteCommand, RenameCommand};
use crate::gateway::Gateway;
use crate::links::resolve_public_link;
use crate::paths::sibling_path;
use crate::response::{DeleteData, GatewayResult, RenameData};
use crate::Result;
use tracing::debug;

pub(crate) fn rename(gateway: &Gateway, cmd: RenameCommand) -> Result<GatewayResult> {
    let client = gateway.client(Some(cmd.token.as_str()))?;
    let new_path = sibling_path(&cmd.disk_path, &cmd.new_name);
    debug!("Moving {} to {}", cmd.disk_path, new_path);

    client.move_resource(&cmd.disk_path, &new_path, true)?;

    let file_url = resolve_public_link(&client, &new_path).or_path(&new_path);
    Ok(GatewayResult::success(
        format!("Renamed to {}", cmd.new_name),
        &RenameData {
            old_path: cmd.disk_path,
            new_path,
            file_url,
        },
    ))
}

pub(crate) fn delete(gateway: &Gateway, cmd: DeleteCommand) -> Result<GatewayResult> {
    let client = gateway.client(Some(cmd.token.as_str()))?;
    client.delete(&cmd.disk_path, cmd.permanently)?;

    let message = if cmd.permanently {
        "Deleted"
    } else {
        "Moved to trash"
    };
    Ok(GatewayResult::success(
        message,
        &DeleteData {
            disk_path: cmd.disk_path,
        },
    ))
}
