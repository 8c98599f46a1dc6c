//! Helper utilities for diskgate testing

use crate::TEST_TOKEN;
use diskgate_core::{Environment, Gateway, GatewayConfig};
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};

/// Configuration pointing at a mock provider, with no retry delays
pub fn test_config(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.api.base_url = server.base_url();
    config.retry.initial_delay_ms = 0;
    config.timeouts.api_secs = 5;
    config.timeouts.transfer_secs = 30;
    config.timeouts.probe_secs = 5;
    config
}

/// Gateway on a plain host talking to the mock provider
pub fn test_gateway(server: &MockServer) -> Gateway {
    Gateway::new(test_config(server)).with_environment(Environment::Standalone)
}

/// `GET /resources/upload` answering with `href`
pub fn mock_upload_link<'a>(server: &'a MockServer, disk_path: &str, href: &str) -> Mock<'a> {
    let body = json!({"href": href, "method": "PUT", "templated": false});
    server.mock(|when, then| {
        when.method(GET)
            .path("/resources/upload")
            .query_param("path", disk_path)
            .header("authorization", format!("OAuth {}", TEST_TOKEN));
        then.status(200).json_body(body);
    })
}

/// `GET /resources/download` answering with `href`
pub fn mock_download_link<'a>(server: &'a MockServer, disk_path: &str, href: &str) -> Mock<'a> {
    let body = json!({"href": href, "method": "GET", "templated": false});
    server.mock(|when, then| {
        when.method(GET)
            .path("/resources/download")
            .query_param("path", disk_path);
        then.status(200).json_body(body);
    })
}

/// `GET /resources` metadata for `disk_path`
pub fn mock_metadata<'a>(server: &'a MockServer, disk_path: &str, body: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/resources")
            .query_param("path", disk_path);
        then.status(200).json_body(body);
    })
}
