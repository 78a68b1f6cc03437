use crate::headers::unfolded_header;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref REPORT_TYPE: Regex =
        Regex::new(r#"(?i)report-type=["']?delivery-status["']?"#).expect("valid regex");
}

/// Which classifier a bounce message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Dsn,
    Body,
}

/// Decide from the message header block alone: a
/// `multipart/report; report-type=delivery-status` content type is a DSN,
/// everything else (including a missing content type) is a plain body.
pub fn route(header: &str) -> Route {
    let Some(content_type) = unfolded_header(header, "Content-Type") else {
        return Route::Body;
    };

    let is_report = content_type
        .to_ascii_lowercase()
        .contains("multipart/report");
    if is_report && REPORT_TYPE.is_match(&content_type) {
        Route::Dsn
    } else {
        Route::Body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_status_report_routes_to_dsn() {
        let header = "From: MAILER-DAEMON@example.net\r\n\
            Content-Type: multipart/report; report-type=delivery-status;\r\n\
            \tboundary=\"B1\"\r\n\
            Subject: Undelivered Mail Returned to Sender\r\n";
        assert_eq!(route(header), Route::Dsn);
    }

    #[test]
    fn test_report_type_on_folded_line_and_quoted() {
        let header = "Content-Type: Multipart/Report;\n  Report-Type=\"Delivery-Status\"; boundary=x\n";
        assert_eq!(route(header), Route::Dsn);
    }

    #[test]
    fn test_other_content_routes_to_body() {
        assert_eq!(route("Content-Type: text/plain; charset=us-ascii\n"), Route::Body);
        assert_eq!(
            route("Content-Type: multipart/report; report-type=disposition-notification\n"),
            Route::Body
        );
        assert_eq!(
            route("Content-Type: multipart/mixed\nX-Note: report-type=delivery-status\n"),
            Route::Body
        );
        assert_eq!(route("Subject: no content type\n"), Route::Body);
        assert_eq!(route(""), Route::Body);
    }
}
