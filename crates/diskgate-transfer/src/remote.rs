use crate::{source::TransferSource, Result, TransferError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{
    HeaderMap, ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use std::fmt;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, trace};

/// A source that streams the body of an HTTP GET response.
///
/// The body is never buffered as a whole: bytes are pulled from the open
/// connection as the consumer reads.
pub struct HttpSource {
    url: String,
    response: Option<Response>,
    status: u16,
    len: Option<u64>,
    content_type: Option<String>,
    file_name: Option<String>,
    /// Start offset reported by `Content-Range`
    range_start: Option<u64>,
    /// Full object size reported by `Content-Range`
    complete_size: Option<u64>,
}

impl HttpSource {
    /// Start streaming `url` from the beginning
    ///
    /// # Errors
    /// Returns an error if the connection fails, the server answers with a
    /// non-success status, or the response is an HTML page
    pub fn open(client: &Client, url: &str) -> Result<Self> {
        Self::open_from(client, url, 0)
    }

    /// Start streaming `url`, asking for the bytes from `offset` onwards when
    /// `offset` is non-zero. Servers may ignore the range and answer `200`;
    /// check [`HttpSource::range_start`] to see what was actually sent.
    ///
    /// # Errors
    /// Same as [`HttpSource::open`]
    pub fn open_from(client: &Client, url: &str, offset: u64) -> Result<Self> {
        Self::start(get_request(client, url, offset), url)
    }

    /// Like [`HttpSource::open_from`], but gives up when the server stays
    /// silent for `read_timeout`, either before the headers or between two
    /// reads of the body. A slow body that keeps arriving is never cut off.
    ///
    /// # Errors
    /// Same as [`HttpSource::open`]
    pub fn open_with_timeout(
        client: &Client,
        url: &str,
        offset: u64,
        read_timeout: Duration,
    ) -> Result<Self> {
        Self::start(get_request(client, url, offset).timeout(read_timeout), url)
    }

    fn start(request: RequestBuilder, url: &str) -> Result<Self> {
        debug!("Opening stream to {}", url);

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let headers = response.headers();
        let content_type = header_str(headers, CONTENT_TYPE.as_str());
        if let Some(ref ct) = content_type {
            if ct.to_lowercase().contains("text/html") {
                return Err(TransferError::HtmlResponse {
                    content_type: ct.clone(),
                });
            }
        }

        let len = match header_str(headers, CONTENT_LENGTH.as_str()) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| TransferError::InvalidLength(raw.clone()))?,
            ),
            None => None,
        };

        let (range_start, complete_size) = header_str(headers, CONTENT_RANGE.as_str())
            .and_then(|raw| parse_content_range(&raw))
            .map_or((None, None), |(start, size)| (Some(start), size));

        let file_name = header_str(headers, CONTENT_DISPOSITION.as_str())
            .and_then(|raw| parse_disposition_filename(&raw));

        match len {
            Some(len) => debug!("Stream size: {} bytes", len),
            None => debug!("Stream size unknown, progress will be reported in bytes"),
        }
        if let Some(ref name) = file_name {
            debug!("File name from Content-Disposition: {}", name);
        }

        Ok(Self {
            url: url.to_string(),
            status: status.as_u16(),
            response: Some(response),
            len,
            content_type,
            file_name,
            range_start,
            complete_size,
        })
    }

    /// URL being streamed
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status of the response
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `Content-Type` header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File name advertised by `Content-Disposition`
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// First byte offset of a partial (`206`) response
    pub fn range_start(&self) -> Option<u64> {
        self.range_start
    }

    /// Full object size from `Content-Range`, if the server sent it
    pub fn complete_size(&self) -> Option<u64> {
        self.complete_size
    }
}

impl Read for HttpSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.response.as_mut() {
            Some(response) => {
                let n = response.read(buf)?;
                trace!("Read {} bytes from {}", n, self.url);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

impl TransferSource for HttpSource {
    fn length(&self) -> Option<u64> {
        self.len
    }

    fn close(&mut self) {
        if self.response.take().is_some() {
            debug!("Stream connection to {} closed", self.url);
        }
    }

    fn is_closed(&self) -> bool {
        self.response.is_none()
    }

    fn describe(&self) -> String {
        format!("url {}", self.url)
    }
}

impl fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSource")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("len", &self.len)
            .field("content_type", &self.content_type)
            .field("range_start", &self.range_start)
            .field("closed", &self.response.is_none())
            .finish()
    }
}

fn get_request(client: &Client, url: &str, offset: u64) -> RequestBuilder {
    let request = client
        .get(url)
        .header(ACCEPT, "*/*")
        .header(ACCEPT_ENCODING, "identity")
        .header(CACHE_CONTROL, "no-cache");
    if offset > 0 {
        request.header(RANGE, format!("bytes={}-", offset))
    } else {
        request
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Parse `bytes <start>-<end>/<size|*>` into the start offset and full size
pub fn parse_content_range(raw: &str) -> Option<(u64, Option<u64>)> {
    let rest = raw.trim().strip_prefix("bytes")?.trim_start();
    let (range, size) = rest.split_once('/')?;
    let (start, _end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let size = size.trim().parse().ok();
    Some((start, size))
}

/// Extract `filename=` from a `Content-Disposition` value
pub fn parse_disposition_filename(raw: &str) -> Option<String> {
    raw.split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|name| !name.is_empty())
}
