//! The `call`, `help` and `info` commands.
//!
//! Every command receives the tokens after its name and parses them against
//! its own option table. Usage mistakes are reported with a localized
//! one-line reminder before the command fails.

mod call;
mod help;
mod info;

use std::io::{Read, Write};
use std::process::ExitCode;

use ortho_config::Localizer;
use strum::{Display, EnumIter, EnumString};

use crate::IoStreams;
use crate::arguments::ArgumentError;
use crate::client::Client;
use crate::errors::{AppError, ErrorKind};
use crate::localizer::{Message, msg};
use crate::output::Palette;

pub(crate) use call::{CALL_OPTIONS, CallArguments, parse_call_arguments};
pub(crate) use help::HELP_OPTIONS;

/// Names of the available commands.
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum CommandName {
    Call,
    Help,
    Info,
}

/// Everything a command needs besides its tokens and IO streams.
pub(crate) struct CommandContext<'a> {
    pub(crate) client: Client<'a>,
    pub(crate) palette: Palette,
    pub(crate) localizer: &'a dyn Localizer,
}

/// Runs `command` with its tokens.
pub(crate) fn run_command<S, W, E>(
    command: CommandName,
    context: &CommandContext<'_>,
    arguments: &[String],
    io: &mut IoStreams<'_, S, W, E>,
) -> Result<ExitCode, AppError>
where
    S: Read,
    W: Write,
    E: Write,
{
    match command {
        CommandName::Call => call::run(context, arguments, io),
        CommandName::Help => help::run(context, arguments, io),
        CommandName::Info => info::run(context, arguments, io),
    }
}

/// Usage reminders printed for argument errors of one command.
pub(crate) struct UsageMessages {
    pub(crate) missing: Message,
    pub(crate) invalid: Message,
}

/// Writes the reminder matching `error` and returns the sentinel error.
pub(crate) fn report_usage<E: Write>(
    stderr: &mut E,
    localizer: &dyn Localizer,
    error: &ArgumentError,
    messages: &UsageMessages,
) -> AppError {
    let kind = error.kind();
    let entry = if kind == ErrorKind::MissingArgument {
        &messages.missing
    } else {
        &messages.invalid
    };
    let _ = writeln!(stderr, "{}", msg(localizer, entry));
    AppError::Reported(kind)
}

/// Writes a command's help block.
pub(crate) fn write_command_help<W: Write>(
    stdout: &mut W,
    usage: &str,
    summary: &str,
    options: &[crate::arguments::OptionSpec],
) -> Result<(), AppError> {
    writeln!(stdout, "Usage: varlink {usage}\n\n{summary}\n\nOptions:")
        .and_then(|()| crate::arguments::write_option_help(stdout, options))
        .map_err(AppError::WriteOutput)
}
