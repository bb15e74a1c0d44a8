//! `varlink help [ADDRESS/]INTERFACE`

use std::io::{Read, Write};
use std::process::ExitCode;

use super::{CommandContext, UsageMessages, report_usage, write_command_help};
use crate::IoStreams;
use crate::arguments::{ArgumentError, HELP_OPTION, OptionSpec, parse_options};
use crate::client::Introspection;
use crate::errors::AppError;
use crate::idl::{DESCRIPTION_WIDTH, render_description};
use crate::localizer::diagnostics;
use crate::target::InterfaceTarget;

pub(crate) const HELP_OPTIONS: &[OptionSpec] = &[HELP_OPTION];

const USAGE: &str = "help [OPTIONS] [ADDRESS/]INTERFACE";
const SUMMARY: &str = "Print the description of an interface.";

enum HelpArguments {
    Help,
    Describe(InterfaceTarget),
}

fn parse_help_arguments(tokens: &[String]) -> Result<HelpArguments, ArgumentError> {
    let parsed = parse_options(HELP_OPTIONS, tokens)?;
    if parsed.show_help {
        return Ok(HelpArguments::Help);
    }
    let mut positionals = parsed.positionals.into_iter();
    let target: InterfaceTarget = positionals
        .next()
        .ok_or(ArgumentError::MissingPositional("INTERFACE"))?
        .parse()?;
    if let Some(extra) = positionals.next() {
        return Err(ArgumentError::UnexpectedArgument(extra));
    }
    Ok(HelpArguments::Describe(target))
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
    let target = match parse_help_arguments(arguments) {
        Ok(HelpArguments::Help) => {
            write_command_help(io.stdout, USAGE, SUMMARY, HELP_OPTIONS)?;
            return Ok(ExitCode::SUCCESS);
        }
        Ok(HelpArguments::Describe(target)) => target,
        Err(error) => {
            let messages = UsageMessages {
                missing: diagnostics::HELP_MISSING_ARGUMENT,
                invalid: diagnostics::HELP_INVALID_ARGUMENT,
            };
            return Err(report_usage(io.stderr, context.localizer, &error, &messages));
        }
    };

    let mut connection = context
        .client
        .connect(target.address.as_ref(), &target.interface)?;
    let rendered = match context.client.describe(&mut connection, &target.interface)? {
        // A missing interface is an answer, not a failure of the client.
        Introspection::RemoteError(name) => format!("Error: {name}\n"),
        Introspection::Description(description) => {
            render_description(&description, DESCRIPTION_WIDTH, context.palette)
        }
    };
    io.stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| io.stdout.flush())
        .map_err(AppError::WriteOutput)?;
    Ok(ExitCode::SUCCESS)
}
