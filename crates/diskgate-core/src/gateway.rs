//! Request dispatch

use crate::actions;
use crate::client::DiskClient;
use crate::command::{Command, TransferFlags};
use crate::config::GatewayConfig;
use crate::environment::Environment;
use crate::links::{DirectLinkResolver, NoDirectLinks};
use crate::request::Request;
use crate::response::GatewayResult;
use crate::Result;
use diskgate_transfer::{LogProgress, NoProgress, ProgressSink, TransferOptions};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the progress sink for one transfer from its label
pub type ProgressFactory = Arc<dyn Fn(&str) -> Arc<dyn ProgressSink> + Send + Sync>;

/// Entry point: one call in, one [`GatewayResult`] out
#[derive(Clone)]
pub struct Gateway {
    config: GatewayConfig,
    environment: Environment,
    resolver: Arc<dyn DirectLinkResolver>,
    progress: ProgressFactory,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Gateway for the detected host environment, logging progress through
    /// `tracing`
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            environment: Environment::detect(),
            resolver: Arc::new(NoDirectLinks),
            progress: Arc::new(|label: &str| -> Arc<dyn ProgressSink> {
                Arc::new(LogProgress::new(label))
            }),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_link_resolver(mut self, resolver: Arc<dyn DirectLinkResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the sink used when a request asks for progress
    pub fn with_progress<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn ProgressSink> + Send + Sync + 'static,
    {
        self.progress = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub(crate) fn resolver(&self) -> &dyn DirectLinkResolver {
        self.resolver.as_ref()
    }

    pub(crate) fn client(&self, token: Option<&str>) -> Result<DiskClient> {
        DiskClient::new(&self.config, token)
    }

    /// Transfer options for one stream: request chunk size first, then the
    /// configured one, then the size policy
    pub(crate) fn transfer_options(&self, label: &str, flags: &TransferFlags) -> TransferOptions {
        let sink: Arc<dyn ProgressSink> = if flags.show_progress {
            (self.progress)(label)
        } else {
            Arc::new(NoProgress)
        };
        TransferOptions::default()
            .with_chunk_size(flags.chunk_size.or_else(|| self.config.chunk_size()))
            .with_sink(sink)
    }

    /// Validate and run one request
    pub fn execute(&self, request: &Request) -> GatewayResult {
        let command = match request.validate(&self.config.list) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected request: {}", e);
                return GatewayResult::from_error(&e);
            }
        };
        self.run(command)
    }

    /// Run a request given as a JSON mapping
    pub fn execute_value(&self, value: serde_json::Value) -> GatewayResult {
        match Request::from_value(value) {
            Ok(request) => self.execute(&request),
            Err(e) => GatewayResult::from_error(&e),
        }
    }

    /// Run an already validated command
    pub fn run(&self, command: Command) -> GatewayResult {
        let action = command.action();
        info!("Running {} ({})", action, self.environment);

        let outcome = match command {
            Command::Upload(cmd) => actions::upload::run(self, cmd),
            Command::Download(cmd) => actions::download::run(self, cmd),
            Command::Rename(cmd) => actions::manage::rename(self, cmd),
            Command::Delete(cmd) => actions::manage::delete(self, cmd),
            Command::List(cmd) => actions::list::run(self, cmd),
        };

        match outcome {
            Ok(result) => {
                info!("{} finished: {}", action, result.message);
                result
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                GatewayResult::from_error(&e)
            }
        }
    }
}

/// Run one request with the default configuration
pub fn execute(value: serde_json::Value) -> GatewayResult {
    Gateway::default().execute_value(value)
}
