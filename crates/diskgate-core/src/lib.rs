//! diskgate - a single-call gateway to a cloud disk
//!
//! A request names an action (`upload`, `download`, `rename`, `delete`,
//! `list`) and its parameters. The gateway validates it, talks to the
//! provider REST API and answers with a uniform `{ok, message, data}`
//! result. File bodies are streamed through `diskgate-transfer`.

pub mod actions;
pub mod client;
pub mod command;
pub mod config;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod links;
pub mod model;
pub mod paths;
pub mod request;
pub mod response;
pub mod retry;

pub use error::{Error, Result};

// Re-export commonly used types
pub use actions::download::{save_to_file, SavedFile};
pub use actions::upload::stream_upload;
pub use client::DiskClient;
pub use command::{Command, DownloadTarget, UploadSource};
pub use config::GatewayConfig;
pub use environment::Environment;
pub use gateway::{execute, Gateway, ProgressFactory};
pub use links::{DirectLinkResolver, LinkResolution, NoDirectLinks};
pub use request::{Action, Request};
pub use response::{FailureKind, GatewayResult};
pub use retry::RetryPolicy;
