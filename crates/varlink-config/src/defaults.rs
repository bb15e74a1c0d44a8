use crate::address::ServiceAddress;

/// Well-known socket of the varlink resolver service.
pub const DEFAULT_RESOLVER_PATH: &str = "/run/org.varlink.resolver";

/// Default log filter expression used by the binary.
///
/// The CLI writes its real output to stdout, so diagnostics stay quiet unless
/// an operator asks for them.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Address of the resolver consulted when a call names no service address.
pub fn default_resolver_address() -> ServiceAddress {
    ServiceAddress::unix(DEFAULT_RESOLVER_PATH)
}
