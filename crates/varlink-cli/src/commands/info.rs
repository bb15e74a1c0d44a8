//! `varlink info ADDRESS`

use std::io::{Read, Write};
use std::process::ExitCode;

use varlink_config::ServiceAddress;

use super::{CommandContext, UsageMessages, report_usage, write_command_help};
use crate::IoStreams;
use crate::arguments::{ArgumentError, HELP_OPTION, OptionSpec, parse_options};
use crate::client::ServiceInfo;
use crate::errors::{AppError, ErrorKind};
use crate::localizer::diagnostics;
use crate::output::{Palette, Style};
use crate::target::TargetParseError;
use crate::transport;

const INFO_OPTIONS: &[OptionSpec] = &[HELP_OPTION];

const USAGE: &str = "info [OPTIONS] ADDRESS";
const SUMMARY: &str = "Print information about the service listening on ADDRESS.";
const INFO_METHOD: &str = "org.varlink.service.GetInfo";

enum InfoArguments {
    Help,
    Query(ServiceAddress),
}

fn parse_info_arguments(tokens: &[String]) -> Result<InfoArguments, ArgumentError> {
    let parsed = parse_options(INFO_OPTIONS, tokens)?;
    if parsed.show_help {
        return Ok(InfoArguments::Help);
    }
    let mut positionals = parsed.positionals.into_iter();
    let address: ServiceAddress = positionals
        .next()
        .ok_or(ArgumentError::MissingPositional("ADDRESS"))?
        .parse()
        .map_err(|error| ArgumentError::Target(TargetParseError::Address(error)))?;
    if let Some(extra) = positionals.next() {
        return Err(ArgumentError::UnexpectedArgument(extra));
    }
    Ok(InfoArguments::Query(address))
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
    let address = match parse_info_arguments(arguments) {
        Ok(InfoArguments::Help) => {
            write_command_help(io.stdout, USAGE, SUMMARY, INFO_OPTIONS)?;
            return Ok(ExitCode::SUCCESS);
        }
        Ok(InfoArguments::Query(address)) => address,
        Err(error) => {
            let messages = UsageMessages {
                missing: diagnostics::INFO_MISSING_ARGUMENT,
                invalid: diagnostics::INFO_INVALID_ARGUMENT,
            };
            return Err(report_usage(io.stderr, context.localizer, &error, &messages));
        }
    };

    let mut connection = transport::connect(&address)?;
    let reply = context.client.service_info(&mut connection)?;
    if let Some(error) = reply.error {
        let _ = writeln!(io.stderr, "Call failed with error: {error}");
        return Err(AppError::Reported(ErrorKind::RemoteError));
    }
    let info: ServiceInfo = reply.decode(INFO_METHOD)?;
    io.stdout
        .write_all(render_info(&info, context.palette).as_bytes())
        .and_then(|()| io.stdout.flush())
        .map_err(AppError::WriteOutput)?;
    Ok(ExitCode::SUCCESS)
}

fn render_info(info: &ServiceInfo, palette: Palette) -> String {
    let mut output = String::new();
    let fields = [
        ("Vendor:", &info.vendor),
        ("Product:", &info.product),
        ("Version:", &info.version),
        ("URL:", &info.url),
    ];
    for (label, value) in fields.into_iter().filter(|(_, value)| !value.is_empty()) {
        output.push_str(&format!("{} {value}\n", palette.paint(label, Style::Label)));
    }
    output.push_str(&palette.paint("Interfaces:", Style::Label));
    output.push('\n');
    for interface in &info.interfaces {
        output.push_str("  ");
        output.push_str(interface);
        output.push('\n');
    }
    output
}
