use std::collections::BTreeMap;

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Value of the first header called `name`, with folded continuation lines
/// kept (joined by `\n`). Header names compare case-insensitively.
pub fn unfolded_header(raw: &str, name: &str) -> Option<String> {
    let mut lines = raw.split('\n').map(|l| l.trim_end_matches('\r'));

    while let Some(line) = lines.next() {
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        if is_continuation(line) || !field.trim().eq_ignore_ascii_case(name) {
            continue;
        }

        let mut unfolded = value.to_string();
        for next in lines.by_ref() {
            if !is_continuation(next) {
                break;
            }
            unfolded.push('\n');
            unfolded.push_str(next);
        }
        return Some(unfolded.trim().to_string());
    }

    None
}

/// Parse a header block into a name -> value map.
///
/// Leading blank lines are skipped and parsing stops at the first blank
/// line after a header, so a full message can be passed in. A repeated
/// header keeps its last value.
pub fn headers_map(raw: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in raw.split('\n').map(|l| l.trim_end_matches('\r')) {
        if line.trim().is_empty() {
            if current.is_some() || !headers.is_empty() {
                break;
            }
            continue;
        }

        if is_continuation(line) {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.insert(name, value);
        }

        if let Some((name, value)) = line.split_once(':') {
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                current = Some((name.to_string(), value.trim().to_string()));
            }
        }
    }

    if let Some((name, value)) = current {
        headers.insert(name, value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "Return-Path: <>\r\n\
        Content-Type: multipart/report;\r\n\
        \treport-type=delivery-status;\r\n\
        \tboundary=\"abc\"\r\n\
        Subject: Undelivered Mail\r\n\
        \r\n\
        This is the body: not a header\r\n";

    #[test]
    fn test_unfolded_header_keeps_continuations() {
        let value = unfolded_header(RAW, "content-type").unwrap();
        assert!(value.starts_with("multipart/report;"));
        assert!(value.contains("report-type=delivery-status"));
        assert!(value.contains("boundary=\"abc\""));
        assert!(!value.contains("Subject"));
    }

    #[test]
    fn test_unfolded_header_missing() {
        assert_eq!(unfolded_header(RAW, "X-Mailer"), None);
        assert_eq!(unfolded_header("", "Content-Type"), None);
    }

    #[test]
    fn test_headers_map_stops_at_body() {
        let headers = headers_map(RAW);
        assert_eq!(headers.get("Return-Path").map(String::as_str), Some("<>"));
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("multipart/report; report-type=delivery-status; boundary=\"abc\"")
        );
        assert_eq!(headers.get("Subject").map(String::as_str), Some("Undelivered Mail"));
        assert!(!headers.contains_key("This is the body"));
    }

    #[test]
    fn test_headers_map_last_duplicate_wins() {
        let headers = headers_map("\nX-Campaign: 1\nX-Campaign: 2\n");
        assert_eq!(headers.get("X-Campaign").map(String::as_str), Some("2"));
        assert_eq!(headers.len(), 1);
    }
}
