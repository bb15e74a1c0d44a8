//! Shell completion candidates.
//!
//! A shell asks for candidates with `varlink --complete=WORD [TOKENS...]`,
//! where the tokens are the words already typed. Candidates are printed one
//! per line. Lookups that fail yield no candidates rather than an error.

use std::io::Write;

use strum::IntoEnumIterator;
use tracing::debug;
use varlink_config::ServiceAddress;

use crate::arguments::{OptionSpec, parse_options};
use crate::client::Client;
use crate::commands::{CALL_OPTIONS, CallArguments, CommandName, HELP_OPTIONS, parse_call_arguments};
use crate::errors::AppError;

const GLOBAL_FLAGS: &[&str] = &[
    "--help",
    "--version",
    "--color",
    "--config-path",
    "--resolver",
    "--timeout",
    "--log-filter",
    "--log-format",
];

/// Placeholder offered for the parameter position of a call.
const EMPTY_PARAMETERS: &str = "'{}'";

/// Source of interface and method names.
pub(crate) trait MethodCatalog {
    /// Interfaces known to the resolver, or implemented by `address`.
    fn interfaces(&self, address: Option<&ServiceAddress>) -> Result<Vec<String>, AppError>;

    fn methods(
        &self,
        address: Option<&ServiceAddress>,
        interface: &str,
    ) -> Result<Vec<String>, AppError>;
}

impl MethodCatalog for Client<'_> {
    fn interfaces(&self, address: Option<&ServiceAddress>) -> Result<Vec<String>, AppError> {
        Client::interfaces(self, address)
    }

    fn methods(
        &self,
        address: Option<&ServiceAddress>,
        interface: &str,
    ) -> Result<Vec<String>, AppError> {
        Client::methods(self, address, interface)
    }
}

/// Writes candidates completing `word` after the `command` and `tokens` typed
/// so far.
pub(crate) fn complete<W: Write>(
    catalog: &dyn MethodCatalog,
    command: Option<&str>,
    tokens: &[String],
    word: &str,
    out: &mut W,
) -> Result<(), AppError> {
    let mut candidates = Vec::new();
    match command.map(str::parse::<CommandName>) {
        None => complete_top_level(word, &mut candidates),
        Some(Ok(CommandName::Call)) => complete_call(catalog, tokens, word, &mut candidates),
        Some(Ok(CommandName::Help)) => complete_help(catalog, tokens, word, &mut candidates),
        Some(Ok(CommandName::Info)) | Some(Err(_)) => {}
    }
    for candidate in candidates
        .iter()
        .filter(|candidate| candidate.starts_with(word))
    {
        writeln!(out, "{candidate}").map_err(AppError::WriteOutput)?;
    }
    Ok(())
}

fn complete_top_level(word: &str, candidates: &mut Vec<String>) {
    if word.starts_with('-') {
        candidates.extend(GLOBAL_FLAGS.iter().map(|flag| (*flag).to_owned()));
    } else {
        candidates.extend(CommandName::iter().map(|command| command.to_string()));
    }
}

fn option_candidates(options: &[OptionSpec], candidates: &mut Vec<String>) {
    candidates.extend(options.iter().map(|option| format!("--{}", option.long)));
}

fn complete_call(
    catalog: &dyn MethodCatalog,
    tokens: &[String],
    word: &str,
    candidates: &mut Vec<String>,
) {
    if word.starts_with('-') {
        option_candidates(CALL_OPTIONS, candidates);
        return;
    }
    // Tokens that do not parse leave no target, so members are offered.
    match parse_call_arguments(tokens) {
        Ok(CallArguments::Request(request)) => {
            if request.raw_parameters.is_none() {
                candidates.push(EMPTY_PARAMETERS.to_owned());
            }
        }
        Ok(CallArguments::Help) | Err(_) => complete_members(catalog, word, candidates),
    }
}

fn complete_help(
    catalog: &dyn MethodCatalog,
    tokens: &[String],
    word: &str,
    candidates: &mut Vec<String>,
) {
    if word.starts_with('-') {
        option_candidates(HELP_OPTIONS, candidates);
        return;
    }
    match parse_options(HELP_OPTIONS, tokens) {
        Ok(parsed) if !parsed.show_help && parsed.positionals.is_empty() => {}
        _ => return,
    }
    let Some((prefix, address, _)) = split_word(word) else {
        return;
    };
    match catalog.interfaces(address.as_ref()) {
        Ok(interfaces) => candidates.extend(
            interfaces
                .into_iter()
                .map(|interface| format!("{prefix}{interface}")),
        ),
        Err(error) => debug!(%error, "interface lookup failed"),
    }
}

/// Completes `[ADDRESS/]INTERFACE.METHOD`.
///
/// Once the word names an interface its methods are offered; otherwise the
/// known interfaces are offered with a trailing `.`.
fn complete_members(catalog: &dyn MethodCatalog, word: &str, candidates: &mut Vec<String>) {
    let Some((prefix, address, name)) = split_word(word) else {
        return;
    };
    if let Some((interface, _)) = name.rsplit_once('.') {
        match catalog.methods(address.as_ref(), interface) {
            Ok(methods) if !methods.is_empty() => {
                candidates.extend(
                    methods
                        .into_iter()
                        .map(|method| format!("{prefix}{interface}.{method}")),
                );
                return;
            }
            Ok(_) => {}
            Err(error) => debug!(%error, interface, "method lookup failed"),
        }
    }
    match catalog.interfaces(address.as_ref()) {
        Ok(interfaces) => candidates.extend(
            interfaces
                .into_iter()
                .map(|interface| format!("{prefix}{interface}.")),
        ),
        Err(error) => debug!(%error, "interface lookup failed"),
    }
}

/// Splits `ADDRESS/NAME`, returning the literal prefix, the parsed address
/// and the name. Returns `None` when the address does not parse.
fn split_word(word: &str) -> Option<(String, Option<ServiceAddress>, &str)> {
    match word.rsplit_once('/') {
        Some((address, name)) => {
            let parsed = address.parse().ok()?;
            Some((format!("{address}/"), Some(parsed), name))
        }
        None => Some((String::new(), None, word)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use rstest::{fixture, rstest};

    #[derive(Default)]
    struct StaticCatalog {
        interfaces: Vec<String>,
        methods: Vec<(String, Vec<String>)>,
        seen_addresses: RefCell<Vec<Option<ServiceAddress>>>,
    }

    impl MethodCatalog for StaticCatalog {
        fn interfaces(&self, address: Option<&ServiceAddress>) -> Result<Vec<String>, AppError> {
            self.seen_addresses.borrow_mut().push(address.cloned());
            Ok(self.interfaces.clone())
        }

        fn methods(
            &self,
            address: Option<&ServiceAddress>,
            interface: &str,
        ) -> Result<Vec<String>, AppError> {
            self.seen_addresses.borrow_mut().push(address.cloned());
            self.methods
                .iter()
                .find(|(name, _)| name == interface)
                .map(|(_, methods)| methods.clone())
                .ok_or_else(|| AppError::RemoteError(String::from("org.varlink.service.InterfaceNotFound")))
        }
    }

    struct FailingCatalog;

    impl MethodCatalog for FailingCatalog {
        fn interfaces(&self, _address: Option<&ServiceAddress>) -> Result<Vec<String>, AppError> {
            Err(AppError::ConnectionClosed)
        }

        fn methods(
            &self,
            _address: Option<&ServiceAddress>,
            _interface: &str,
        ) -> Result<Vec<String>, AppError> {
            Err(AppError::ConnectionClosed)
        }
    }

    #[fixture]
    fn catalog() -> StaticCatalog {
        StaticCatalog {
            interfaces: vec![
                String::from("org.example.ping"),
                String::from("org.example.more"),
            ],
            methods: vec![(
                String::from("org.example.ping"),
                vec![String::from("Ping"), String::from("Pong")],
            )],
            ..StaticCatalog::default()
        }
    }

    fn candidates(
        catalog: &dyn MethodCatalog,
        command: Option<&str>,
        tokens: &[&str],
        word: &str,
    ) -> Vec<String> {
        let tokens: Vec<String> = tokens.iter().map(|token| (*token).to_owned()).collect();
        let mut out = Vec::new();
        complete(catalog, command, &tokens, word, &mut out).expect("completion writes");
        String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[rstest]
    fn top_level_offers_commands(catalog: StaticCatalog) {
        assert_eq!(candidates(&catalog, None, &[], "c"), ["call"]);
        assert_eq!(candidates(&catalog, None, &[], ""), ["call", "help", "info"]);
        assert_eq!(candidates(&catalog, None, &[], "--res"), ["--resolver"]);
    }

    #[rstest]
    fn call_offers_interfaces_with_trailing_dot(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("call"), &[], "org.example.m"),
            ["org.example.more."]
        );
    }

    #[rstest]
    fn call_offers_methods_of_a_known_interface(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("call"), &[], "org.example.ping.P"),
            ["org.example.ping.Ping", "org.example.ping.Pong"]
        );
    }

    #[rstest]
    fn call_keeps_the_address_prefix(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("call"), &[], "tcp:127.0.0.1:9/org.example.ping.Pi"),
            ["tcp:127.0.0.1:9/org.example.ping.Ping"]
        );
        assert_eq!(
            catalog.seen_addresses.borrow().first().cloned().flatten(),
            Some(ServiceAddress::tcp("127.0.0.1", 9))
        );
    }

    #[rstest]
    fn call_offers_parameter_placeholder_after_target(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("call"), &["org.example.ping.Ping"], ""),
            ["'{}'"]
        );
        assert!(candidates(&catalog, Some("call"), &["org.example.ping.Ping", "{}"], "").is_empty());
    }

    #[rstest]
    #[case(&["--bogus"])]
    #[case(&["Ping"])]
    #[case(&["-m", "bogus/org.x"])]
    fn unparsed_tokens_fall_back_to_members(catalog: StaticCatalog, #[case] tokens: &[&str]) {
        assert_eq!(
            candidates(&catalog, Some("call"), tokens, ""),
            ["org.example.ping.", "org.example.more."]
        );
    }

    #[rstest]
    fn call_offers_its_options(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("call"), &[], "--"),
            ["--help", "--more"]
        );
    }

    #[rstest]
    fn help_offers_plain_interfaces(catalog: StaticCatalog) {
        assert_eq!(
            candidates(&catalog, Some("help"), &[], "org.example.p"),
            ["org.example.ping"]
        );
    }

    #[test]
    fn lookup_failures_produce_no_candidates() {
        assert!(candidates(&FailingCatalog, Some("call"), &[], "org.").is_empty());
        assert!(candidates(&FailingCatalog, Some("help"), &[], "").is_empty());
    }

    #[rstest]
    fn malformed_words_produce_no_candidates(catalog: StaticCatalog) {
        assert!(candidates(&catalog, Some("call"), &[], "bogus/org.x").is_empty());
        assert!(candidates(&catalog, Some("unknown"), &[], "").is_empty());
    }
}
