//! Best-effort parsing of the address lists found in delivery-status
//! recipient fields.

use std::fmt;

/// Host filled in when an address has no domain part.
pub const DEFAULT_HOST: &str = "default.domain.name";

/// Host reported for input that cannot be parsed as an address.
pub const SYNTAX_ERROR_HOST: &str = ".SYNTAX-ERROR.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub mailbox: String,
    pub host: String,
}

impl Address {
    fn syntax_error(mailbox: &str) -> Self {
        Address {
            mailbox: mailbox.to_string(),
            host: SYNTAX_ERROR_HOST.to_string(),
        }
    }

    /// False for the placeholder hosts produced by [`parse_first_address`].
    pub fn has_real_host(&self, default_host: &str) -> bool {
        self.host != SYNTAX_ERROR_HOST && self.host != default_host
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.mailbox, self.host)
    }
}

/// Split off the first entry of a comma-separated address list, ignoring
/// commas inside quotes, angle brackets and comments.
fn first_entry(list: &str) -> &str {
    let mut in_quotes = false;
    let mut angle = 0usize;
    let mut comment = 0usize;

    for (pos, c) in list.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle += 1,
            '>' if !in_quotes => angle = angle.saturating_sub(1),
            '(' if !in_quotes => comment += 1,
            ')' if !in_quotes => comment = comment.saturating_sub(1),
            ',' if !in_quotes && angle == 0 && comment == 0 => return &list[..pos],
            _ => {}
        }
    }
    list
}

fn strip_comments(entry: &str) -> String {
    let mut out = String::with_capacity(entry.len());
    let mut depth = 0usize;
    for c in entry.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn valid_local_part(local: &str) -> bool {
    if local.len() > 1 && local.starts_with('"') && local.ends_with('"') {
        return true;
    }
    !local.is_empty()
        && !local
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>()[]\\,;:@\"".contains(c))
}

fn valid_host(host: &str) -> bool {
    if host.starts_with('[') && host.ends_with(']') {
        return host.len() > 2;
    }
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
}

/// Parse the first address of an address list.
///
/// An address without a domain gets `default_host`; anything that does not
/// look like `local@host` gets [`SYNTAX_ERROR_HOST`]. Returns `None` only
/// for empty input.
pub fn parse_first_address(list: &str, default_host: &str) -> Option<Address> {
    let entry = first_entry(list.trim()).trim();
    if entry.is_empty() {
        return None;
    }

    let spec = match (entry.find('<'), entry.rfind('>')) {
        (Some(open), Some(close)) if open < close => entry[open + 1..close].trim().to_string(),
        (None, None) => strip_comments(entry).trim().to_string(),
        _ => return Some(Address::syntax_error(entry)),
    };

    // drop an obsolete source route: <@relay1,@relay2:user@host>
    let spec = match spec.strip_prefix('@').and_then(|rest| rest.split_once(':')) {
        Some((_, addr)) => addr.trim().to_string(),
        None => spec,
    };

    if spec.is_empty() {
        return Some(Address::syntax_error(entry));
    }

    let (mailbox, host) = match spec.rsplit_once('@') {
        Some((mailbox, host)) => (mailbox, host),
        None => (spec.as_str(), default_host),
    };

    if !valid_local_part(mailbox) || !valid_host(host) {
        return Some(Address::syntax_error(mailbox));
    }

    Some(Address {
        mailbox: mailbox.to_string(),
        host: host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Address {
        parse_first_address(input, DEFAULT_HOST).unwrap()
    }

    #[test]
    fn test_bare_and_bracketed_addresses() {
        assert_eq!(parse(" jdoe@example.com").to_string(), "jdoe@example.com");
        assert_eq!(parse("<jdoe@example.com>").to_string(), "jdoe@example.com");
        assert_eq!(
            parse("\"Doe, John\" <jdoe@example.com>, other@example.org").to_string(),
            "jdoe@example.com"
        );
        assert_eq!(parse("jdoe@example.com (John Doe)").to_string(), "jdoe@example.com");
    }

    #[test]
    fn test_missing_host_gets_default() {
        let addr = parse("postmaster");
        assert_eq!(addr.host, DEFAULT_HOST);
        assert!(!addr.has_real_host(DEFAULT_HOST));
    }

    #[test]
    fn test_garbage_is_syntax_error() {
        for input in ["jdoe@", "@example.com", "jdoe@exa mple.com", "<jdoe@example.com", "j doe@example.com"] {
            let addr = parse(input);
            assert_eq!(addr.host, SYNTAX_ERROR_HOST, "input: {input}");
            assert!(!addr.has_real_host(DEFAULT_HOST));
        }
    }

    #[test]
    fn test_source_route_dropped() {
        assert_eq!(
            parse("<@relay.example.net:jdoe@example.com>").to_string(),
            "jdoe@example.com"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_first_address("   ", DEFAULT_HOST), None);
    }
}
