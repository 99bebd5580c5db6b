//! Windows-1252 codec for the local file.
//!
//! B3 publishes the composition in a Western single-byte code page; every
//! read and write of the local file goes through here.

use encoding_rs::WINDOWS_1252;

/// Decode bytes as Windows-1252. Every byte maps to a char, so this cannot fail.
pub fn decode(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Encode text as Windows-1252.
///
/// Returns the first character the code page cannot represent as the error.
pub fn encode(text: &str) -> Result<Vec<u8>, char> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        let bad = text
            .chars()
            .find(|c| {
                let mut buf = [0u8; 4];
                WINDOWS_1252.encode(c.encode_utf8(&mut buf)).2
            })
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Err(bad);
    }
    Ok(bytes.into_owned())
}
