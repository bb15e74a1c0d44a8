//! Configuration loading and argument splitting for the varlink CLI.
//!
//! Global flags precede the command. The split hands configuration flags to
//! `ortho_config`, the global flags and command word to `clap`, and leaves the
//! command's own tokens untouched so each command can parse them itself.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use varlink_config::Config;

use crate::errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `varlink_config::Config`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--resolver",
    "--timeout",
    "--log-filter",
    "--log-format",
];

/// Global flags handled by `clap` alone that take a value.
const VALUE_CLI_FLAGS: &[&str] = &["--color", "--complete"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the command name. Flags after
    /// it belong to the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum FlagAction {
    Config { needs_value: bool },
    Global { needs_value: bool },
    Command,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with('-') || text == "-" {
        return FlagAction::Command;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Config {
            needs_value: !has_inline_value,
        };
    }
    FlagAction::Global {
        needs_value: VALUE_CLI_FLAGS.contains(&flag) && !has_inline_value,
    }
}

/// Arguments routed to each consumer.
#[derive(Debug, Default, Eq, PartialEq)]
pub(crate) struct ArgumentSplit {
    /// Program name plus configuration flags, for `ortho_config`.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name, every global flag and the command word, for `clap`.
    pub(crate) global_arguments: Vec<OsString>,
    /// Tokens after the command word.
    pub(crate) command_arguments: Vec<String>,
}

pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let mut split = ArgumentSplit::default();
    let Some(program) = args.first() else {
        return split;
    };
    split.config_arguments.push(program.clone());
    split.global_arguments.push(program.clone());

    let mut index = 1usize;
    while index < args.len() {
        let argument = &args[index];
        let value = args.get(index + 1);
        match classify(argument) {
            FlagAction::Config { needs_value } => {
                split.config_arguments.push(argument.clone());
                split.global_arguments.push(argument.clone());
                if let (true, Some(value)) = (needs_value, value) {
                    split.config_arguments.push(value.clone());
                    split.global_arguments.push(value.clone());
                    index += 1;
                }
            }
            FlagAction::Global { needs_value } => {
                split.global_arguments.push(argument.clone());
                if let (true, Some(value)) = (needs_value, value) {
                    split.global_arguments.push(value.clone());
                    index += 1;
                }
            }
            FlagAction::Command => {
                split.global_arguments.push(argument.clone());
                split.command_arguments = args[index + 1..]
                    .iter()
                    .map(|token| token.to_string_lossy().into_owned())
                    .collect();
                break;
            }
        }
        index += 1;
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Config { needs_value: false })]
    #[case("--log-filter", FlagAction::Config { needs_value: true })]
    #[case("--color", FlagAction::Global { needs_value: true })]
    #[case("--color=never", FlagAction::Global { needs_value: false })]
    #[case("--help", FlagAction::Global { needs_value: false })]
    #[case("--unknown", FlagAction::Global { needs_value: false })]
    #[case("call", FlagAction::Command)]
    #[case("-", FlagAction::Command)]
    fn flags_are_classified(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[test]
    fn splits_config_global_and_command_tokens() {
        let split = split_arguments(&os(&[
            "varlink",
            "--resolver",
            "tcp:127.0.0.1:1",
            "--color",
            "never",
            "call",
            "-m",
            "org.example.Ping",
            "--timeout",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["varlink", "--resolver", "tcp:127.0.0.1:1"])
        );
        assert_eq!(
            split.global_arguments,
            os(&["varlink", "--resolver", "tcp:127.0.0.1:1", "--color", "never", "call"])
        );
        assert_eq!(split.command_arguments, ["-m", "org.example.Ping", "--timeout"]);
    }

    #[test]
    fn bare_invocation_has_no_command_tokens() {
        let split = split_arguments(&os(&["varlink"]));
        assert_eq!(split.global_arguments, os(&["varlink"]));
        assert!(split.command_arguments.is_empty());
    }

    #[test]
    fn completion_word_may_look_like_a_flag() {
        let split = split_arguments(&os(&["varlink", "--complete", "--m", "call"]));
        assert_eq!(
            split.global_arguments,
            os(&["varlink", "--complete", "--m", "call"])
        );
    }
}
