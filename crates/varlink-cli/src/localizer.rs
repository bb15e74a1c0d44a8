//! Localization support for the varlink CLI.
//!
//! User-facing usage text is resolved through a Fluent catalogue embedded in
//! the binary. When the catalogue cannot be loaded the hardcoded English
//! fallbacks are used instead.

use std::io::Write;

use ortho_config::{FluentLocalizer, Localizer, NoOpLocalizer};

/// Embedded en-US Fluent catalogue.
pub(crate) static VARLINK_EN_US: &str = include_str!("../locales/en-US/messages.ftl");

/// A message definition: `(fluent_id, english_fallback)`.
///
/// Fallbacks must match `locales/en-US/messages.ftl`; the
/// `fluent_and_fallback_outputs_are_identical` test guards against drift.
pub(crate) type Message = (&'static str, &'static str);

mod bare_help {
    use super::Message;

    pub(super) const USAGE: Message = (
        "varlink-bare-help-usage",
        "Usage: varlink [OPTIONS] COMMAND [ARGUMENTS]...",
    );
    pub(super) const HEADER: Message = ("varlink-bare-help-header", "Commands:");
    pub(super) const CALL: Message = ("varlink-bare-help-command-call", "call   Call a method");
    pub(super) const HELP: Message = (
        "varlink-bare-help-command-help",
        "help   Print the description of an interface",
    );
    pub(super) const INFO: Message = (
        "varlink-bare-help-command-info",
        "info   Print information about a service",
    );
    pub(super) const POINTER: Message = (
        "varlink-bare-help-pointer",
        "Run 'varlink --help' for more information.",
    );
}

pub(crate) mod diagnostics {
    use super::Message;

    pub(crate) const UNKNOWN_COMMAND: Message = (
        "varlink-unknown-command",
        "Unknown command. Run 'varlink --help' for the list of commands.",
    );
    pub(crate) const CALL_MISSING_ARGUMENT: Message = (
        "varlink-call-missing-argument",
        "Missing argument, INTERFACE.METHOD [ARGUMENTS] expected",
    );
    pub(crate) const CALL_INVALID_ARGUMENT: Message = (
        "varlink-call-invalid-argument",
        "Invalid argument, INTERFACE.METHOD [ARGUMENTS] expected",
    );
    pub(crate) const CALL_MISSING_METHOD: Message =
        ("varlink-call-missing-method", "Missing method.");
    pub(crate) const HELP_MISSING_ARGUMENT: Message = (
        "varlink-help-missing-argument",
        "Missing argument, [ADDRESS/]INTERFACE expected",
    );
    pub(crate) const HELP_INVALID_ARGUMENT: Message = (
        "varlink-help-invalid-argument",
        "Invalid argument, [ADDRESS/]INTERFACE expected",
    );
    pub(crate) const INFO_MISSING_ARGUMENT: Message = (
        "varlink-info-missing-argument",
        "Missing argument, ADDRESS expected",
    );
    pub(crate) const INFO_INVALID_ARGUMENT: Message = (
        "varlink-info-invalid-argument",
        "Invalid argument, ADDRESS expected",
    );
}

/// Resolves a single message through the localizer.
pub(crate) fn msg(localizer: &dyn Localizer, entry: &Message) -> String {
    localizer.message(entry.0, None, entry.1)
}

/// Builds the application localizer, falling back to [`NoOpLocalizer`].
pub(crate) fn build_localizer() -> Box<dyn Localizer> {
    match FluentLocalizer::with_en_us_defaults([VARLINK_EN_US]) {
        Ok(localizer) => Box::new(localizer),
        Err(_) => Box::new(NoOpLocalizer),
    }
}

/// Writes the help block shown when no command is given.
///
/// # Errors
///
/// Returns [`std::io::Error`] if writing to the underlying stream fails.
pub(crate) fn write_bare_help<W: Write>(
    writer: &mut W,
    localizer: &dyn Localizer,
) -> std::io::Result<()> {
    use bare_help::{CALL, HEADER, HELP, INFO, POINTER, USAGE};
    let usage = msg(localizer, &USAGE);
    let header = msg(localizer, &HEADER);
    let call = msg(localizer, &CALL);
    let help = msg(localizer, &HELP);
    let info = msg(localizer, &INFO);
    let pointer = msg(localizer, &POINTER);
    write!(
        writer,
        "{usage}\n\n{header}\n  {call}\n  {help}\n  {info}\n\n{pointer}\n",
    )
}
