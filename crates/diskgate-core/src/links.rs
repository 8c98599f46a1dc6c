//! Public link resolution

use crate::client::DiskClient;
use tracing::{debug, info};

/// Host that serves provider share pages
const SHARE_HOST: &str = "disk.yandex.ru";
/// Prefix of signed file links, which are not share pages
const DOWNLOADER_PREFIX: &str = "https://downloader.disk.yandex.ru/";

/// Outcome of a link lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    Resolved(String),
    Unresolved,
}

impl LinkResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LinkResolution::Resolved(_))
    }

    /// The resolved link, or `fallback` when unresolved
    pub fn or_path(self, fallback: &str) -> String {
        match self {
            LinkResolution::Resolved(url) => url,
            LinkResolution::Unresolved => fallback.to_string(),
        }
    }
}

/// Public link of a resource: existing `public_url`, else publish it and
/// read the metadata again. Failures along the way are logged and end in
/// [`LinkResolution::Unresolved`].
pub fn resolve_public_link(client: &DiskClient, path: &str) -> LinkResolution {
    match client.resource(path) {
        Ok(resource) => {
            if let Some(url) = resource.public_url {
                debug!("{} already has a public link", path);
                return LinkResolution::Resolved(url);
            }
        }
        Err(e) => {
            debug!("Could not read metadata of {}: {}", path, e);
            return LinkResolution::Unresolved;
        }
    }

    if let Err(e) = client.publish(path) {
        debug!("Could not publish {}: {}", path, e);
        return LinkResolution::Unresolved;
    }

    match client.resource(path) {
        Ok(resource) => match resource.public_url {
            Some(url) => {
                info!("Published {}", path);
                LinkResolution::Resolved(url)
            }
            None => {
                debug!("{} was published but has no public link yet", path);
                LinkResolution::Unresolved
            }
        },
        Err(e) => {
            debug!("Could not re-read metadata of {}: {}", path, e);
            LinkResolution::Unresolved
        }
    }
}

/// True for provider share pages, which serve HTML rather than the file
pub fn is_share_page(url: &str) -> bool {
    url.contains(SHARE_HOST) && !url.starts_with(DOWNLOADER_PREFIX)
}

/// Turns a share page URL into a direct file URL
pub trait DirectLinkResolver: Send + Sync {
    fn resolve(&self, share_url: &str) -> LinkResolution;
}

/// Resolver that never finds a direct link
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDirectLinks;

impl DirectLinkResolver for NoDirectLinks {
    fn resolve(&self, share_url: &str) -> LinkResolution {
        debug!("No direct link resolver configured for {}", share_url);
        LinkResolution::Unresolved
    }
}

impl<F> DirectLinkResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, share_url: &str) -> LinkResolution {
        match self(share_url) {
            Some(url) => LinkResolution::Resolved(url),
            None => LinkResolution::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> DiskClient {
        let mut config = GatewayConfig::default();
        config.api.base_url = server.base_url();
        config.retry.initial_delay_ms = 0;
        DiskClient::new(&config, Some("token-123456")).unwrap()
    }

    #[test]
    fn test_share_page_detection() {
        assert!(is_share_page("https://disk.yandex.ru/d/NS-00uW07T-EsQ"));
        assert!(!is_share_page("https://downloader.disk.yandex.ru/disk/abc"));
        assert!(!is_share_page("https://example.com/file.mp3"));
    }

    #[test]
    fn test_or_path() {
        assert_eq!(LinkResolution::Resolved("u".into()).or_path("p"), "u");
        assert_eq!(LinkResolution::Unresolved.or_path("p"), "p");
    }

    #[test]
    fn test_existing_public_url() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/resources");
            then.status(200)
                .json_body(json!({"path": "disk:/a", "public_url": "https://yadi.sk/d/a"}));
        });
        let publish = server.mock(|when, then| {
            when.method(PUT).path("/resources/publish");
            then.status(200);
        });

        let resolution = resolve_public_link(&client_for(&server), "disk:/a");
        assert_eq!(resolution, LinkResolution::Resolved("https://yadi.sk/d/a".into()));
        assert_eq!(publish.hits(), 0);
    }

    #[test]
    fn test_publish_failure_is_unresolved() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/resources");
            then.status(200).json_body(json!({"path": "disk:/a"}));
        });
        let publish = server.mock(|when, then| {
            when.method(PUT).path("/resources/publish");
            then.status(403).json_body(json!({"message": "Forbidden"}));
        });

        let resolution = resolve_public_link(&client_for(&server), "disk:/a");
        assert_eq!(resolution, LinkResolution::Unresolved);
        publish.assert();
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |url: &str| url.strip_prefix("share:").map(|rest| format!("direct:{}", rest));
        assert_eq!(resolver.resolve("share:x"), LinkResolution::Resolved("direct:x".into()));
        assert_eq!(resolver.resolve("other"), LinkResolution::Unresolved);
        assert_eq!(NoDirectLinks.resolve("https://disk.yandex.ru/d/x"), LinkResolution::Unresolved);
    }
}
