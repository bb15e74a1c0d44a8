//! Per-command option parsing.
//!
//! Each command declares its options as a static [`OptionSpec`] table. The
//! parser walks the tokens in order, permuting options and positionals the
//! way `getopt_long` does, and stops early when an option requests help.

use thiserror::Error;

use crate::errors::ErrorKind;
use crate::target::TargetParseError;

/// What a recognised option does to the request being assembled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum OptionEffect {
    /// Print command help and stop parsing.
    ShowHelp,
    /// Ask the service for multiple replies.
    WantMore,
}

/// Declarative description of one command flag.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OptionSpec {
    pub(crate) short: char,
    pub(crate) long: &'static str,
    pub(crate) effect: OptionEffect,
    pub(crate) summary: &'static str,
}

impl OptionSpec {
    pub(crate) const fn flag(
        short: char,
        long: &'static str,
        effect: OptionEffect,
        summary: &'static str,
    ) -> Self {
        Self {
            short,
            long,
            effect,
            summary,
        }
    }
}

/// The standard `-h, --help` option shared by every command.
pub(crate) const HELP_OPTION: OptionSpec =
    OptionSpec::flag('h', "help", OptionEffect::ShowHelp, "Display this help text and exit");

/// Result of walking a command's tokens against its option table.
#[derive(Debug, Default, Eq, PartialEq)]
pub(crate) struct ParsedOptions {
    pub(crate) show_help: bool,
    pub(crate) effects: Vec<OptionEffect>,
    pub(crate) positionals: Vec<String>,
}

impl ParsedOptions {
    pub(crate) fn has(&self, effect: OptionEffect) -> bool {
        self.effects.contains(&effect)
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ArgumentError {
    #[error("unrecognised option '{0}'")]
    UnknownOption(String),
    #[error("option '{0}' does not take a value")]
    UnexpectedValue(String),
    #[error("missing {0}")]
    MissingPositional(&'static str),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error(transparent)]
    Target(#[from] TargetParseError),
}

impl ArgumentError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPositional(_) => ErrorKind::MissingArgument,
            Self::UnknownOption(_)
            | Self::UnexpectedValue(_)
            | Self::UnexpectedArgument(_)
            | Self::Target(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Parses `tokens` against `schema`.
///
/// A lone `-` is positional (it names stdin) and `--` ends option parsing.
/// Unique prefixes of long options are not expanded.
pub(crate) fn parse_options(
    schema: &[OptionSpec],
    tokens: &[String],
) -> Result<ParsedOptions, ArgumentError> {
    let mut parsed = ParsedOptions::default();
    let mut options_done = false;

    for token in tokens {
        if options_done || token == "-" || !token.starts_with('-') {
            parsed.positionals.push(token.clone());
            continue;
        }
        if token == "--" {
            options_done = true;
            continue;
        }

        let specs: Vec<Result<&OptionSpec, ArgumentError>> = match token.strip_prefix("--") {
            Some(long) => vec![find_long(schema, token, long)],
            // Clustered short options such as `-hm`.
            None => token
                .chars()
                .skip(1)
                .map(|short| {
                    schema
                        .iter()
                        .find(|spec| spec.short == short)
                        .ok_or_else(|| ArgumentError::UnknownOption(format!("-{short}")))
                })
                .collect(),
        };
        for spec in specs {
            let spec = spec?;
            if spec.effect == OptionEffect::ShowHelp {
                parsed.show_help = true;
                return Ok(parsed);
            }
            parsed.effects.push(spec.effect);
        }
    }

    Ok(parsed)
}

fn find_long<'a>(
    schema: &'a [OptionSpec],
    token: &str,
    long: &str,
) -> Result<&'a OptionSpec, ArgumentError> {
    let (name, has_value) = match long.split_once('=') {
        Some((name, _)) => (name, true),
        None => (long, false),
    };
    let spec = schema
        .iter()
        .find(|spec| spec.long == name)
        .ok_or_else(|| ArgumentError::UnknownOption(token.to_owned()))?;
    if has_value {
        return Err(ArgumentError::UnexpectedValue(format!("--{name}")));
    }
    Ok(spec)
}

/// Writes the option table of a command as help text.
pub(crate) fn write_option_help<W: std::io::Write>(
    writer: &mut W,
    schema: &[OptionSpec],
) -> std::io::Result<()> {
    for spec in schema {
        let flag = format!("-{}, --{}", spec.short, spec.long);
        writeln!(writer, "  {flag:<22} {}", spec.summary)?;
    }
    Ok(())
}
