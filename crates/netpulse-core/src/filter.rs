//! Capture filter expression builder.
//!
//! Turns the optional host/protocol/port predicates into a single BPF
//! expression for the capture source. Values are passed through untouched;
//! checking their syntax is left to the filter compiler.

/// Up to three optional filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub host: Option<String>,
    pub protocol: Option<String>,
    pub port: Option<String>,
}

impl FilterSpec {
    /// Compose the predicates as described for [`build_filter`].
    pub fn expression(&self) -> String {
        build_filter(
            self.host.as_deref().unwrap_or(""),
            self.protocol.as_deref().unwrap_or(""),
            self.port.as_deref().unwrap_or(""),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.expression().is_empty()
    }
}

/// Build a conjunctive filter: `host <host> and <protocol> and port <port>`.
///
/// Blank inputs contribute no clause; when all three are blank the result is
/// the empty string, meaning "capture everything".
///
/// # Examples
/// ```
/// use netpulse_core::build_filter;
///
/// assert_eq!(build_filter("", "", ""), "");
/// assert_eq!(build_filter("10.0.0.1", "tcp", "80"), "host 10.0.0.1 and tcp and port 80");
/// ```
pub fn build_filter(host: &str, protocol: &str, port: &str) -> String {
    let clauses = [
        non_blank(host).map(|host| format!("host {host}")),
        non_blank(protocol).map(str::to_string),
        non_blank(port).map(|port| format!("port {port}")),
    ];
    clauses.into_iter().flatten().collect::<Vec<_>>().join(" and ")
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
