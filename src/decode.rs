use crate::mailbox::TransferEncoding;
use base64::{engine::general_purpose, Engine as _};

/// Undo a transfer encoding. Encodings other than base64 and
/// quoted-printable pass through unchanged.
pub fn decode(text: &str, encoding: TransferEncoding) -> String {
    match encoding {
        TransferEncoding::Base64 => decode_base64(text),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(text),
        _ => text.to_string(),
    }
}

/// Line breaks and other whitespace are ignored, padding is optional.
/// Input that still fails to decode yields empty text.
pub fn decode_base64(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let unpadded = compact.trim_end_matches('=');

    match general_purpose::STANDARD_NO_PAD.decode(unpadded) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(e) => {
            log::warn!("Discarding undecodable base64 text: {e}");
            String::new()
        }
    }
}

pub fn decode_quoted_printable(text: &str) -> String {
    match quoted_printable::decode(text.as_bytes(), quoted_printable::ParseMode::Robust) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(_) => text.to_string(),
    }
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
