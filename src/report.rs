//! Field extraction from the machine-readable `message/delivery-status`
//! part of a DSN.

use crate::address::{parse_first_address, DEFAULT_HOST};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref ORIGINAL_RECIPIENT: Regex =
        Regex::new(r"(?i)Original-Recipient: rfc822;(.*)").expect("valid regex");
    static ref FINAL_RECIPIENT: Regex =
        Regex::new(r"(?i)Final-Recipient: rfc822;(.*)").expect("valid regex");
    static ref ACTION: Regex = Regex::new(r"(?i)Action: (.+)").expect("valid regex");
    static ref STATUS: Regex = Regex::new(r"(?i)Status: ([0-9.]+)").expect("valid regex");
    // value runs on while the next line starts with a space or tab
    static ref DIAGNOSTIC_CODE: Regex =
        Regex::new(r"(?is)Diagnostic-Code:((?:[^\n]|\n[\t ])+)(?:\n[^\t ]|\n?\z)")
            .expect("valid regex");
}

/// The per-recipient fields a classifier needs from a delivery-status block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub recipient: Option<String>,
    /// Lower-cased action token: failed, delayed, delivered, relayed, expanded.
    pub action: Option<String>,
    pub status_code: Option<String>,
    /// Text after `Diagnostic-Code:` as it appears in the block, leading
    /// space and folded lines included. Only the final line break is dropped.
    pub diagnostic_code: Option<String>,
}

impl DeliveryStatus {
    pub fn parse(block: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures(block)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };

        let action = capture(&ACTION)
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty());
        let status_code = capture(&STATUS);
        let diagnostic_code = capture(&DIAGNOSTIC_CODE)
            .map(|d| d.strip_suffix('\r').unwrap_or(&d).to_string())
            .filter(|d| !d.trim().is_empty());

        DeliveryStatus {
            recipient: extract_recipient(block),
            action,
            status_code,
            diagnostic_code,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.action
            .as_deref()
            .is_some_and(|action| action.trim().eq_ignore_ascii_case("failed"))
    }
}

/// `Original-Recipient` decides when present, even if its address turns out
/// unusable; `Final-Recipient` is only consulted otherwise.
fn extract_recipient(block: &str) -> Option<String> {
    let field = ORIGINAL_RECIPIENT
        .captures(block)
        .or_else(|| FINAL_RECIPIENT.captures(block))?;
    let raw = field.get(1)?.as_str();

    let address = parse_first_address(raw, DEFAULT_HOST)?;
    if !address.has_real_host(DEFAULT_HOST) {
        log::debug!("Ignoring unusable recipient field: {}", raw.trim());
        return None;
    }
    Some(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Reporting-MTA: dns; mx.example.net\r\n\
        Arrival-Date: Mon, 12 Oct 2026 10:00:00 +0000\r\n\
        \r\n\
        Final-Recipient: rfc822; jdoe@example.com\r\n\
        Action: Failed\r\n\
        Status: 5.1.1\r\n\
        Remote-MTA: dns; mail.example.com\r\n\
        Diagnostic-Code: smtp; 550-5.1.1 The email account that you tried to reach\r\n \
        does not exist. Please try double-checking the recipient's email\r\n\
        Last-Attempt-Date: Mon, 12 Oct 2026 10:00:01 +0000\r\n";

    #[test]
    fn test_parse_full_report() {
        let status = DeliveryStatus::parse(REPORT);
        assert_eq!(status.recipient.as_deref(), Some("jdoe@example.com"));
        assert_eq!(status.action.as_deref(), Some("failed"));
        assert!(status.is_failed());
        assert_eq!(status.status_code.as_deref(), Some("5.1.1"));

        let diagnostic = status.diagnostic_code.unwrap();
        assert!(diagnostic.starts_with(" smtp; 550-5.1.1"), "{diagnostic:?}");
        assert!(diagnostic.contains("reach\r\n does not exist"));
        assert!(diagnostic.ends_with("recipient's email"));
        assert!(diagnostic.contains("does not exist"));
        assert!(!diagnostic.contains("Last-Attempt-Date"));
    }

    #[test]
    fn test_diagnostic_code_at_end_of_block() {
        let status = DeliveryStatus::parse("Action: delayed\nDiagnostic-Code: smtp; 452 4.2.2 over quota\n");
        assert_eq!(status.diagnostic_code.as_deref(), Some(" smtp; 452 4.2.2 over quota"));
        assert_eq!(status.action.as_deref(), Some("delayed"));
        assert_eq!(status.recipient, None);
    }

    #[test]
    fn test_original_recipient_preferred() {
        let block = "Original-Recipient: rfc822;list@example.org\n\
            Final-Recipient: rfc822;jdoe@example.com\n";
        let status = DeliveryStatus::parse(block);
        assert_eq!(status.recipient.as_deref(), Some("list@example.org"));
    }

    #[test]
    fn test_placeholder_recipient_rejected() {
        let status = DeliveryStatus::parse("Final-Recipient: rfc822; postmaster\nAction: failed\n");
        assert_eq!(status.recipient, None);

        let status = DeliveryStatus::parse("Final-Recipient: rfc822; jdoe@\nAction: failed\n");
        assert_eq!(status.recipient, None);
    }

    #[test]
    fn test_blank_diagnostic_code_is_absent() {
        let status = DeliveryStatus::parse("Action: failed\r\nDiagnostic-Code: \r\n");
        assert_eq!(status.diagnostic_code, None);
    }

    #[test]
    fn test_is_failed_ignores_case() {
        for action in ["failed", "Failed", "FAILED", " failed "] {
            let status = DeliveryStatus {
                action: Some(action.to_string()),
                ..Default::default()
            };
            assert!(status.is_failed(), "{action:?}");
        }
        let status = DeliveryStatus {
            action: Some("delayed".to_string()),
            ..Default::default()
        };
        assert!(!status.is_failed());
        assert!(!DeliveryStatus::default().is_failed());
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(DeliveryStatus::parse(""), DeliveryStatus::default());
    }
}
