//! Global command-line flags for the varlink client.
//!
//! Only the flags before the command word are parsed here; each command
//! parses its own tokens.

use clap::Parser;

use crate::output::ColorChoice;

/// Command-line client for varlink services.
#[derive(Parser, Debug)]
#[command(
    name = "varlink",
    version,
    about = "Call methods of varlink services and inspect their interfaces",
    after_help = "Commands:\n  call   Call a method\n  help   Print the description of an interface\n  info   Print information about a service"
)]
#[allow(
    dead_code,
    reason = "configuration flags are parsed here for validation and help; ortho_config loads their values"
)]
pub(crate) struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub(crate) config_path: Option<String>,
    /// Address of the resolver service.
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) resolver: Option<String>,
    /// Seconds to wait for a reply.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) timeout: Option<u64>,
    /// Filter expression for diagnostics on stderr.
    #[arg(long, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Diagnostic format: compact or json.
    #[arg(long, value_name = "FORMAT")]
    pub(crate) log_format: Option<String>,
    /// When to colour output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub(crate) color: ColorChoice,
    /// Prints completion candidates for WORD and exits.
    #[arg(long, value_name = "WORD", hide = true, allow_hyphen_values = true)]
    pub(crate) complete: Option<String>,
    /// The command to run: call, help or info.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
}

impl Cli {
    /// Returns true when neither a command nor a completion request was given.
    pub(crate) fn is_bare_invocation(&self) -> bool {
        self.command.is_none() && self.complete.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_globals_and_command() {
        let cli = Cli::try_parse_from(["varlink", "--color", "never", "--timeout", "3", "call"])
            .expect("arguments parse");
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.timeout, Some(3));
        assert_eq!(cli.command.as_deref(), Some("call"));
        assert!(!cli.is_bare_invocation());
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        assert!(Cli::try_parse_from(["varlink", "--timeout", "soon", "call"]).is_err());
    }

    #[test]
    fn detects_bare_invocation() {
        let cli = Cli::try_parse_from(["varlink"]).expect("no arguments parse");
        assert!(cli.is_bare_invocation());
    }

    #[test]
    fn completion_request_is_not_bare() {
        let cli = Cli::try_parse_from(["varlink", "--complete=ca"]).expect("arguments parse");
        assert!(!cli.is_bare_invocation());
    }
}
