//! Directory listing

use crate::client::DiskClient;
use crate::command::ListCommand;
use crate::gateway::Gateway;
use crate::links::resolve_public_link;
use crate::model::Resource;
use crate::response::{GatewayResult, ListData, ListItem};
use crate::Result;

pub(crate) fn run(gateway: &Gateway, cmd: ListCommand) -> Result<GatewayResult> {
    let client = gateway.client(Some(cmd.token.as_str()))?;
    let resource = client.list(&cmd.disk_path, cmd.limit, cmd.offset)?;

    let embedded = resource.embedded.unwrap_or_default();
    let total = embedded.total.unwrap_or(embedded.items.len() as u64);
    let items: Vec<ListItem> = embedded
        .items
        .into_iter()
        .map(|resource| {
            let file_url = file_link(&client, &resource);
            list_item(resource, file_url)
        })
        .collect();

    Ok(GatewayResult::success(
        format!("Items: {} of {}", items.len(), total),
        &ListData {
            disk_path: cmd.disk_path,
            items,
            total,
            limit: cmd.limit,
            offset: cmd.offset,
        },
    ))
}

/// Files get a link: their public URL, else one obtained by publishing
/// them, else their path. Directories get none.
fn file_link(client: &DiskClient, resource: &Resource) -> Option<String> {
    if !resource.is_file() {
        return None;
    }
    if let Some(url) = &resource.public_url {
        return Some(url.clone());
    }
    resource
        .path
        .as_deref()
        .map(|path| resolve_public_link(client, path).or_path(path))
}

fn list_item(resource: Resource, file_url: Option<String>) -> ListItem {
    ListItem {
        name: resource.name,
        kind: resource.kind,
        size: resource.size,
        mime_type: resource.mime_type,
        path: resource.path,
        file_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    // Points nowhere: these cases must not reach the network
    fn offline_client() -> DiskClient {
        let mut config = GatewayConfig::default();
        config.api.base_url = "http://127.0.0.1:1".to_string();
        DiskClient::new(&config, Some("token-123456")).unwrap()
    }

    #[test]
    fn test_file_link_prefers_public_url() {
        let client = offline_client();

        let published = Resource {
            name: Some("a.txt".into()),
            path: Some("disk:/a.txt".into()),
            kind: Some("file".into()),
            public_url: Some("https://yadi.sk/d/a".into()),
            ..Resource::default()
        };
        assert_eq!(
            file_link(&client, &published).as_deref(),
            Some("https://yadi.sk/d/a")
        );

        let dir = Resource {
            path: Some("disk:/dir".into()),
            kind: Some("dir".into()),
            ..Resource::default()
        };
        assert!(file_link(&client, &dir).is_none());
    }

    #[test]
    fn test_list_item_keeps_fields() {
        let item = list_item(
            Resource {
                name: Some("b.txt".into()),
                path: Some("disk:/b.txt".into()),
                kind: Some("file".into()),
                size: Some(4),
                ..Resource::default()
            },
            Some("disk:/b.txt".into()),
        );
        assert_eq!(item.name.as_deref(), Some("b.txt"));
        assert_eq!(item.size, Some(4));
        assert_eq!(item.file_url.as_deref(), Some("disk:/b.txt"));
    }
}
