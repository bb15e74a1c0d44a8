//! Shared configuration for the varlink command-line client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! TOML file (`--config-path` or `VARLINK_CONFIG_PATH`), then `VARLINK_*`
//! environment variables, then command-line flags.

mod address;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use address::{AddressParseError, ServiceAddress};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_RESOLVER_PATH, default_log_filter, default_log_filter_string,
    default_log_format, default_resolver_address,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by every command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "VARLINK")]
pub struct Config {
    /// Address of the resolver used to locate services by interface name.
    #[serde(default = "default_resolver_address")]
    #[ortho_config(default = default_resolver_address())]
    pub resolver: ServiceAddress,
    /// Seconds to wait for a reply before giving up; waits forever when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// `tracing` filter expression applied to diagnostics on stderr.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Diagnostic output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver: default_resolver_address(),
            timeout: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Address of the resolver service.
    #[must_use]
    pub fn resolver(&self) -> &ServiceAddress {
        &self.resolver
    }

    /// Maximum time to wait for a reply, if bounded.
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Filter expression for diagnostics.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Format for diagnostics.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
