//! Provider REST response bodies

use serde::Deserialize;

/// Signed link returned by the upload and download endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub templated: Option<bool>,
}

/// Resource metadata, with embedded children for directories
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<ResourceList>,
}

impl Resource {
    pub fn is_file(&self) -> bool {
        self.kind.as_deref() == Some("file")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_listing_body() {
        let body = r#"{
            "name": "music",
            "path": "disk:/music",
            "type": "dir",
            "_embedded": {
                "items": [
                    {"name": "a.mp3", "path": "disk:/music/a.mp3", "type": "file", "size": 3, "mime_type": "audio/mpeg"},
                    {"name": "old", "path": "disk:/music/old", "type": "dir"}
                ],
                "total": 2,
                "limit": 20,
                "offset": 0
            }
        }"#;

        let resource: Resource = serde_json::from_str(body).unwrap();
        assert!(!resource.is_file());
        let list = resource.embedded.unwrap();
        assert_eq!(list.total, Some(2));
        assert!(list.items[0].is_file());
        assert_eq!(list.items[0].size, Some(3));
        assert!(list.items[1].public_url.is_none());
    }

    #[test]
    fn test_link_without_href() {
        let link: Link = serde_json::from_str(r#"{"method": "GET"}"#).unwrap();
        assert!(link.href.is_none());
    }
}
