use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source responded with HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Received an HTML page ({content_type}) instead of a file, check the URL")]
    HtmlResponse { content_type: String },

    #[error("Invalid Content-Length header: {0}")]
    InvalidLength(String),

    #[error("Source initialization failed: {0}")]
    Init(String),

    #[error("Transfer interrupted: {0}")]
    Interrupted(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;

impl TransferError {
    /// True when the failure came from the network layer before any byte
    /// was transferred (connect errors and timeouts).
    pub fn is_connect(&self) -> bool {
        matches!(self, TransferError::Http(e) if e.is_connect() || e.is_timeout())
    }
}

impl From<TransferError> for std::io::Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io(io_err) => io_err,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
