//! Tracing subscriber setup.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// `[logging]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
}

const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn,alloy_transport_http=warn,alloy_rpc_client=warn";

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "pretty".into()
}

impl LoggingConfig {
    /// Installs the global subscriber. `RUST_LOG` wins over `level`.
    ///
    /// HTTP and RPC transport crates are capped at `warn` unless `RUST_LOG`
    /// says otherwise; a receipt poll logs on every block.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directives()));

        if self.format == "json" {
            fmt()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_env_filter(filter)
                .init();
        } else {
            fmt().with_target(false).with_env_filter(filter).init();
        }
    }

    fn directives(&self) -> String {
        format!("{},{QUIET_DEPENDENCIES}", self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}
