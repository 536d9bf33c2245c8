//! Character encoding for legacy device firmware.
//!
//! Older device CLIs speak single-byte charsets, not UTF-8. Commands are
//! therefore encoded Windows-1252-first, and captures are decoded with a
//! fallback chain that can never fail — a decoding anomaly substitutes
//! visible characters rather than aborting the command.

use encoding_rs::WINDOWS_1252;

/// Encode command text for the wire.
///
/// Legacy single-byte encoding is preferred; UTF-8 is used only when the
/// text cannot be represented in Windows-1252.
pub fn encode_command(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        text.as_bytes().to_vec()
    } else {
        bytes.into_owned()
    }
}

/// Decode a raw capture, stripping ANSI escape sequences.
///
/// Valid UTF-8 is taken as-is. A capture that still carries valid
/// multi-byte sequences is UTF-8 with stray bytes — each anomaly becomes a
/// replacement character. Only a capture whose non-ASCII content is
/// entirely invalid is treated as legacy single-byte text and read as
/// Windows-1252, which maps every byte.
pub fn decode_capture(raw: &[u8]) -> String {
    let cleaned = strip_ansi_escapes::strip(raw);
    match String::from_utf8(cleaned) {
        Ok(text) => text,
        Err(err) => {
            let lossy = String::from_utf8_lossy(err.as_bytes());
            if lossy
                .chars()
                .any(|c| !c.is_ascii() && c != char::REPLACEMENT_CHARACTER)
            {
                lossy.into_owned()
            } else {
                let (text, _, _) = WINDOWS_1252.decode(err.as_bytes());
                text.into_owned()
            }
        }
    }
}
