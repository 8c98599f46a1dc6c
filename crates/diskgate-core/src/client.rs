//! Blocking REST client for the storage provider

use crate::config::GatewayConfig;
use crate::model::{Link, Resource};
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use diskgate_transfer::{HttpSource, SharedTransfer};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

const LIST_FIELDS: &str = "_embedded.items.name,_embedded.items.type,_embedded.items.size,\
_embedded.items.mime_type,_embedded.items.path,_embedded.items.public_url,_embedded.total";

const KEEPALIVE: Duration = Duration::from_secs(60);

/// Provider client bound to one token (or none, for public resources)
#[derive(Debug, Clone)]
pub struct DiskClient {
    http: Client,
    base_url: String,
    authorization: Option<String>,
    retry: RetryPolicy,
    api_timeout: Duration,
    probe_timeout: Duration,
    transfer_timeout: Duration,
}

impl DiskClient {
    pub fn new(config: &GatewayConfig, token: Option<&str>) -> Result<Self> {
        // REST calls and probes carry their own deadlines, streamed bodies none
        let builder = Client::builder()
            .user_agent(config.api.user_agent.clone())
            .connect_timeout(config.probe_timeout())
            .timeout(None::<Duration>)
            .tcp_keepalive(KEEPALIVE);
        // Unacknowledged upload data for this long drops the connection
        #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
        let builder = builder.tcp_user_timeout(config.transfer_timeout());
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            authorization: token.map(|t| format!("{} {}", config.api.auth_scheme, t)),
            retry: config.retry.policy(),
            api_timeout: config.api_timeout(),
            probe_timeout: config.probe_timeout(),
            transfer_timeout: config.transfer_timeout(),
        })
    }

    /// Underlying HTTP client, shared with streaming sources
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.endpoint(path))
            .query(query)
            .header(ACCEPT, "application/json")
            .timeout(self.api_timeout);
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.as_str());
        }
        builder
    }

    /// Send an API call through the retry policy and check its status
    fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        accepted: &[u16],
    ) -> Result<Response> {
        let what = format!("{} {}", method, path);
        debug!("{} {:?}", what, query);
        let response = self
            .retry
            .send(&what, || self.request(method.clone(), path, query).send())?;
        check_status(response, accepted)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.call(Method::GET, path, query, &[200])?;
        Ok(response.json()?)
    }

    fn link_href(link: Link, what: &str) -> Result<String> {
        link.href
            .filter(|href| !href.is_empty())
            .ok_or_else(|| Error::Protocol(format!("no {} link in the response", what)))
    }

    /// Signed URL to PUT the file body to
    pub fn upload_link(&self, path: &str, overwrite: bool) -> Result<String> {
        let overwrite = if overwrite { "true" } else { "false" };
        let response = self.call(
            Method::GET,
            "/resources/upload",
            &[("path", path), ("overwrite", overwrite)],
            &[200, 201],
        )?;
        Self::link_href(response.json()?, "upload")
    }

    /// Signed URL to GET a file on the caller's disk
    pub fn download_link(&self, path: &str) -> Result<String> {
        let link: Link = self.get_json("/resources/download", &[("path", path)])?;
        Self::link_href(link, "download")
    }

    /// Signed URL to GET a published resource
    pub fn public_download_link(&self, public_key: &str, path: Option<&str>) -> Result<String> {
        let mut query = vec![("public_key", public_key)];
        if let Some(path) = path {
            query.push(("path", path));
        }
        let link: Link = self.get_json("/public/resources/download", &query)?;
        Self::link_href(link, "download")
    }

    pub fn resource(&self, path: &str) -> Result<Resource> {
        self.get_json("/resources", &[("path", path)])
    }

    /// One page of a directory listing
    pub fn list(&self, path: &str, limit: u32, offset: u64) -> Result<Resource> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        self.get_json(
            "/resources",
            &[
                ("path", path),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("fields", LIST_FIELDS),
            ],
        )
    }

    pub fn publish(&self, path: &str) -> Result<()> {
        self.call(Method::PUT, "/resources/publish", &[("path", path)], &[200, 201, 202])?;
        Ok(())
    }

    pub fn move_resource(&self, from: &str, to: &str, overwrite: bool) -> Result<()> {
        let overwrite = if overwrite { "true" } else { "false" };
        self.call(
            Method::POST,
            "/resources/move",
            &[("from", from), ("path", to), ("overwrite", overwrite)],
            &[200, 201, 202],
        )?;
        Ok(())
    }

    pub fn delete(&self, path: &str, permanently: bool) -> Result<()> {
        let permanently = if permanently { "true" } else { "false" };
        self.call(
            Method::DELETE,
            "/resources",
            &[("path", path), ("permanently", permanently)],
            &[202, 204],
        )?;
        Ok(())
    }

    /// HEAD a URL and return its status, following redirects
    pub fn probe(&self, url: &str) -> Result<u16> {
        let response = self.http.head(url).timeout(self.probe_timeout).send()?;
        let status = response.status().as_u16();
        trace!("HEAD {} -> {}", url, status);
        Ok(status)
    }

    /// PUT a streamed body to a signed upload URL. Attempted once, a
    /// consumed stream cannot be replayed. There is no overall deadline, a
    /// large upload runs as long as the connection makes progress.
    pub fn put_stream(&self, href: &str, body: SharedTransfer) -> Result<()> {
        let response = self
            .http
            .put(href)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body.into_body())
            .send()?;
        check_status(response, &[200, 201, 202])?;
        Ok(())
    }

    /// Open a streaming GET, optionally from a byte offset. The transfer
    /// timeout bounds each silent wait, not the whole body.
    pub fn open_stream(&self, url: &str, offset: u64) -> diskgate_transfer::Result<HttpSource> {
        HttpSource::open_with_timeout(&self.http, url, offset, self.transfer_timeout)
    }
}

/// Turn a non-accepted status into a provider error carrying the body's
/// message
fn check_status(response: Response, accepted: &[u16]) -> Result<Response> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(Error::Provider {
        status,
        message: error_message(&body),
    })
}

/// Message from a provider error body: `message`, then `description`,
/// then the JSON itself, then the raw text
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["message", "description"]
            .iter()
            .find_map(|key| {
                json.get(key)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| json.to_string()),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer, token: Option<&str>) -> DiskClient {
        let mut config = GatewayConfig::default();
        config.api.base_url = server.base_url();
        config.retry.initial_delay_ms = 0;
        DiskClient::new(&config, token).unwrap()
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"Resource not found.","description":"x"}"#),
            "Resource not found."
        );
        assert_eq!(error_message(r#"{"description":"Unauthorized"}"#), "Unauthorized");
        assert_eq!(error_message(r#"{"error":"Bad"}"#), r#"{"error":"Bad"}"#);
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_upload_link_sends_auth_and_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/resources/upload")
                .header("authorization", "OAuth token-123456")
                .query_param("path", "disk:/a.txt")
                .query_param("overwrite", "true");
            then.status(200)
                .json_body(serde_json::json!({"href": "https://uploader/put", "method": "PUT"}));
        });

        let client = client_for(&server, Some("token-123456"));
        assert_eq!(client.upload_link("disk:/a.txt", true).unwrap(), "https://uploader/put");
        mock.assert();
    }

    #[test]
    fn test_missing_href_is_protocol_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/resources/download");
            then.status(200).json_body(serde_json::json!({}));
        });

        let err = client_for(&server, Some("token-123456"))
            .download_link("disk:/a.txt")
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_provider_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/resources");
            then.status(404)
                .json_body(serde_json::json!({"message": "Resource not found.", "error": "DiskNotFoundError"}));
        });

        let err = client_for(&server, Some("token-123456"))
            .resource("disk:/missing")
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404: Resource not found.");
    }

    #[test]
    fn test_public_link_without_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/public/resources/download")
                .query_param("public_key", "https://yadi.sk/d/abc")
                .query_param("path", "/song.mp3");
            then.status(200)
                .json_body(serde_json::json!({"href": "https://downloader/song"}));
        });

        let client = client_for(&server, None);
        let href = client
            .public_download_link("https://yadi.sk/d/abc", Some("/song.mp3"))
            .unwrap();
        assert_eq!(href, "https://downloader/song");
        mock.assert();
    }

    #[test]
    fn test_delete_accepts_no_content() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/resources")
                .query_param("path", "disk:/a.txt")
                .query_param("permanently", "false");
            then.status(204);
        });

        client_for(&server, Some("token-123456"))
            .delete("disk:/a.txt", false)
            .unwrap();
        mock.assert();
    }
}
