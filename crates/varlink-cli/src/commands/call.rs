//! `varlink call [-m] [ADDRESS/]INTERFACE.METHOD [ARGUMENTS]`

use std::io::{Read, Write};
use std::process::ExitCode;

use tracing::debug;

use super::{CommandContext, UsageMessages, report_usage, write_command_help};
use crate::IoStreams;
use crate::arguments::{ArgumentError, HELP_OPTION, OptionEffect, OptionSpec, parse_options};
use crate::client::dispatch;
use crate::errors::{AppError, ErrorKind};
use crate::localizer::{diagnostics, msg};
use crate::parameters::{RawParameters, load_parameters};
use crate::protocol::{CallFlags, Parameters};
use crate::reply_stream::{CallOutcome, ReplyStream};
use crate::target::{QualifiedTarget, TargetParseError};

pub(crate) const CALL_OPTIONS: &[OptionSpec] = &[
    HELP_OPTION,
    OptionSpec::flag(
        'm',
        "more",
        OptionEffect::WantMore,
        "Wait for multiple method returns if supported",
    ),
];

const USAGE: &str = "call [OPTIONS] [ADDRESS/]INTERFACE.METHOD [ARGUMENTS]";
const SUMMARY: &str = "Call a method. ARGUMENTS is a JSON object; '-' reads it from stdin.";

/// A validated call request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RequestDescriptor {
    pub(crate) flags: CallFlags,
    pub(crate) target: QualifiedTarget,
    pub(crate) raw_parameters: Option<RawParameters>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum CallArguments {
    Help,
    Request(RequestDescriptor),
}

pub(crate) fn parse_call_arguments(tokens: &[String]) -> Result<CallArguments, ArgumentError> {
    let parsed = parse_options(CALL_OPTIONS, tokens)?;
    if parsed.show_help {
        return Ok(CallArguments::Help);
    }
    let flags = if parsed.has(OptionEffect::WantMore) {
        CallFlags::MORE
    } else {
        CallFlags::NONE
    };

    let mut positionals = parsed.positionals.into_iter();
    let target: QualifiedTarget = positionals
        .next()
        .ok_or(ArgumentError::MissingPositional("INTERFACE.METHOD"))?
        .parse()?;
    let raw_parameters = positionals.next().map(RawParameters::from_argument);
    if let Some(extra) = positionals.next() {
        return Err(ArgumentError::UnexpectedArgument(extra));
    }
    Ok(CallArguments::Request(RequestDescriptor {
        flags,
        target,
        raw_parameters,
    }))
}

pub(super) fn run<S, W, E>(
    context: &CommandContext<'_>,
    arguments: &[String],
    io: &mut IoStreams<'_, S, W, E>,
) -> Result<ExitCode, AppError>
where
    S: Read,
    W: Write,
    E: Write,
{
    let request = match parse_call_arguments(arguments) {
        Ok(CallArguments::Help) => {
            write_command_help(io.stdout, USAGE, SUMMARY, CALL_OPTIONS)?;
            return Ok(ExitCode::SUCCESS);
        }
        Ok(CallArguments::Request(request)) => request,
        Err(ArgumentError::Target(TargetParseError::MissingMethod(_))) => {
            let _ = writeln!(io.stderr, "{}", msg(context.localizer, &diagnostics::CALL_MISSING_METHOD));
            return Err(AppError::Reported(ErrorKind::InvalidArgument));
        }
        Err(error) => {
            let messages = UsageMessages {
                missing: diagnostics::CALL_MISSING_ARGUMENT,
                invalid: diagnostics::CALL_INVALID_ARGUMENT,
            };
            return Err(report_usage(io.stderr, context.localizer, &error, &messages));
        }
    };

    let parameters = load_parameters(request.raw_parameters.as_ref(), io.stdin)?;
    let outcome = invoke(context, &request, parameters.as_ref(), io.stdout, io.stderr);
    debug!(target = %request.target, ?outcome, "call complete");
    Ok(outcome.exit_code())
}

/// Performs the call and settles on its outcome.
///
/// Transport failures are reported on stderr here so the outcome carries
/// only their kind.
fn invoke<W: Write, E: Write>(
    context: &CommandContext<'_>,
    request: &RequestDescriptor,
    parameters: Option<&Parameters>,
    stdout: &mut W,
    stderr: &mut E,
) -> CallOutcome {
    let target = &request.target;
    let mut connection = match context
        .client
        .connect(target.address.as_ref(), &target.interface)
    {
        Ok(connection) => connection,
        Err(error) => return local_failure(stderr, "Unable to connect", &error),
    };

    let member = target.member();
    if let Err(error) = dispatch(&mut connection, &member, parameters, request.flags) {
        return local_failure(stderr, "Unable to call", &error);
    }

    let mut stream = ReplyStream::new(request.flags, context.palette, stdout, stderr);
    let result = context
        .client
        .event_loop()
        .process_all(&mut connection, &mut stream);
    let outcome = stream.into_outcome();
    match result {
        Ok(()) => outcome.unwrap_or(CallOutcome::LocalFailure(ErrorKind::Panic)),
        Err(AppError::Canceled) => CallOutcome::Canceled,
        Err(AppError::ConnectionClosed) => {
            let _ = writeln!(stderr, "Connection closed.");
            CallOutcome::LocalFailure(ErrorKind::ConnectionClosed)
        }
        Err(error) => local_failure(stderr, "Unable to process events", &error),
    }
}

fn local_failure<E: Write>(stderr: &mut E, context: &str, error: &AppError) -> CallOutcome {
    let _ = writeln!(stderr, "{context}: {error}");
    CallOutcome::LocalFailure(error.kind())
}
