//! Decoding of handle-tool output.
//!
//! The tool writes in whatever code page the console happens to use, so the
//! raw bytes are tried against a prioritized list of encodings:
//!
//! 1. the preferred encoding (configured, or derived from the locale)
//! 2. UTF-8
//! 3. windows-1251
//! 4. IBM866 (OEM Cyrillic)
//! 5. Latin-1, which maps every byte and cannot fail
//!
//! The first strict decode without replacement characters wins. windows-1251
//! maps every byte but 0x98, so cp866 output is decoded as IBM866 only when it
//! is the preferred encoding (`preferred_encoding` or a CP866 locale).

use encoding_rs::{Encoding, IBM866, UTF_8, WINDOWS_1251};
use tracing::debug;

/// Fallback when neither configuration nor locale names an encoding.
#[cfg(windows)]
const PLATFORM_DEFAULT: &Encoding = encoding_rs::WINDOWS_1252;
#[cfg(not(windows))]
const PLATFORM_DEFAULT: &Encoding = UTF_8;

/// Decode tool output, never failing.
pub fn decode_output(bytes: &[u8], preferred: Option<&str>) -> String {
    for encoding in candidate_encodings(preferred) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!(encoding = encoding.name(), "decoded tool output");
            return text.into_owned();
        }
    }

    debug!("decoded tool output as latin-1");
    bytes.iter().map(|&b| b as char).collect()
}

/// The strict encodings tried, in order, without duplicates.
pub fn candidate_encodings(preferred: Option<&str>) -> Vec<&'static Encoding> {
    let first = preferred
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| locale_encoding(|key| std::env::var(key).ok()))
        .unwrap_or(PLATFORM_DEFAULT);

    let mut encodings: Vec<&'static Encoding> = Vec::with_capacity(4);
    for encoding in [first, UTF_8, WINDOWS_1251, IBM866] {
        if !encodings.contains(&encoding) {
            encodings.push(encoding);
        }
    }
    encodings
}

/// Encoding named by the POSIX locale variables (`LC_ALL`, `LC_CTYPE`, `LANG`).
pub(crate) fn locale_encoding(var: impl Fn(&str) -> Option<String>) -> Option<&'static Encoding> {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .into_iter()
        .filter_map(var)
        .find(|value| !value.trim().is_empty())?;

    let (_, charset) = locale.split_once('.')?;
    let charset = charset.split('@').next().unwrap_or(charset);
    Encoding::for_label(charset.as_bytes())
}
