//! Command-line client for varlink services.
//!
//! The runtime splits the command line into global flags, configuration flags
//! and command tokens, loads layered configuration, and dispatches to the
//! `call`, `help` or `info` command. Every path ends in a single exit status
//! derived from [`ErrorKind`]. IO streams and the configuration loader are
//! injectable so the runtime can be exercised from tests.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use tracing::debug;

mod arguments;
mod cli;
mod client;
mod commands;
mod completion;
mod config;
mod errors;
mod event_loop;
mod idl;
mod localizer;
mod output;
mod parameters;
mod protocol;
mod reply_stream;
mod target;
mod telemetry;
mod transport;

use cli::Cli;
use client::Client;
use commands::{CommandContext, CommandName, run_command};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::{ArgumentSplit, split_arguments};
pub use errors::ErrorKind;
pub(crate) use errors::AppError;
use event_loop::EventLoop;
use localizer::{build_localizer, diagnostics, msg, write_bare_help};
pub use output::ColorChoice;
use output::Palette;

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, S: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut S,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, S: Read, W: Write, E: Write> IoStreams<'a, S, W, E> {
    pub(crate) fn new(
        stdin: &'a mut S,
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

struct CliRunner<'a, S: Read, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, S, W, E>,
    loader: &'a L,
}

impl<'a, S, W, E, L> CliRunner<'a, S, W, E, L>
where
    S: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'a, S, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_arguments(&args);
        match self.execute(&split) {
            Ok(exit_code) => exit_code,
            // Cancellation is the operator's decision, not a failure.
            Err(AppError::Canceled) => ExitCode::SUCCESS,
            Err(AppError::Reported(kind)) => kind.exit_code(),
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                error.exit_code()
            }
        }
    }

    fn execute(&mut self, split: &ArgumentSplit) -> Result<ExitCode, AppError> {
        let cli = match Cli::try_parse_from(&split.global_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_clap_outcome(error),
        };
        let localizer = build_localizer();
        if cli.is_bare_invocation() {
            write_bare_help(self.io.stderr, localizer.as_ref()).map_err(AppError::WriteOutput)?;
            return Err(AppError::Reported(ErrorKind::MissingCommand));
        }

        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;
        let palette = Palette::new(cli.color.resolve(self.io.stdout_is_terminal()));
        let event_loop = EventLoop::new(config.reply_timeout())?;
        let context = CommandContext {
            client: Client::new(&config, &event_loop),
            palette,
            localizer: localizer.as_ref(),
        };

        if let Some(word) = cli.complete.as_deref() {
            completion::complete(
                &context.client,
                cli.command.as_deref(),
                &split.command_arguments,
                word,
                self.io.stdout,
            )?;
            return Ok(ExitCode::SUCCESS);
        }

        let Some(name) = cli.command.as_deref() else {
            return Err(AppError::Reported(ErrorKind::MissingCommand));
        };
        let Ok(command) = name.parse::<CommandName>() else {
            let message = msg(localizer.as_ref(), &diagnostics::UNKNOWN_COMMAND);
            let _ = writeln!(self.io.stderr, "{name}: {message}");
            return Err(AppError::Reported(ErrorKind::CommandNotFound));
        };
        debug!(%command, arguments = ?split.command_arguments, "running command");
        run_command(command, &context, &split.command_arguments, self.io)
    }

    /// `--help` and `--version` are successful outcomes of argument parsing.
    fn report_clap_outcome(&mut self, error: clap::Error) -> Result<ExitCode, AppError> {
        match error.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                write!(self.io.stdout, "{error}").map_err(AppError::WriteOutput)?;
                Ok(ExitCode::SUCCESS)
            }
            _ => Err(AppError::CliUsage(error)),
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, S, W, E>(
    args: I,
    stdin: &mut S,
    stdout: &mut W,
    stderr: &mut E,
    stdout_is_terminal: bool,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    S: Read,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr, stdout_is_terminal);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, S, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, S, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    S: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}
