//! Stream locator: decodes the site's obfuscated media-URL encoding.
//!
//! CDA embeds the direct media location in page metadata behind a fixed,
//! reversible obfuscation (marker substrings, percent-encoding, and a
//! printable-ASCII substitution cipher). The constants below are protocol
//! facts lifted from the site's player; they are deliberately isolated in
//! this one module so an upstream change only touches this file.
//!
//! Malformed input decodes into a malformed URL. That is intentional: the
//! failure then surfaces as an HTTP error when the fetcher uses the URL,
//! not as an error here.

/// Literal marker substrings stripped from the encoded token.
const ENCODING_MARKERS: [&str; 7] = ["_XDDD", "_CDA", "_ADC", "_CXD", "_QWE", "_Q5", "_IKSDE"];

/// Suffix marker removed after the cipher pass.
const FILE_SUFFIX_MARKER: &str = ".cda.mp4";

/// Marker indicating a raw upstream path; the extension goes before it.
const UPSTREAM_MARKER: &str = "/upstream";

/// Default media extension appended to decoded locations.
const MEDIA_EXTENSION: &str = ".mp4";

/// Lower bound of the printable-ASCII cipher range.
const CIPHER_LOW: u32 = 33;

/// Upper bound of the printable-ASCII cipher range.
const CIPHER_HIGH: u32 = 126;

/// Cipher modulus; together with the +14 offset this is a fixed protocol
/// constant, not a tunable.
const CIPHER_MODULUS: u32 = 94;

/// Cipher offset added to each code point before the modulus.
const CIPHER_OFFSET: u32 = 14;

/// Decodes an obfuscated media token into a direct, fetchable stream URL.
///
/// Pure and deterministic: the same encoded input always yields the same
/// URL. The steps mirror the site's player exactly: strip markers,
/// percent-decode, rotate printable-ASCII code points, normalize host
/// variants, and attach the media extension and scheme.
#[must_use]
pub fn decrypt_stream_url(encoded: &str) -> String {
    let mut token = encoded.to_string();
    for marker in ENCODING_MARKERS {
        token = token.replace(marker, "");
    }

    let decoded_bytes = urlencoding::decode_binary(token.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded_bytes);

    let mut location: String = decoded.chars().map(rotate_char).collect();
    location = location.replace(FILE_SUFFIX_MARKER, "");
    location = location.replace(".2cda.pl", ".cda.pl");
    location = location.replace(".3cda.pl", ".cda.pl");

    if location.contains(UPSTREAM_MARKER) {
        location = location.replace(UPSTREAM_MARKER, ".mp4/upstream");
        format!("https://{location}")
    } else {
        format!("https://{location}{MEDIA_EXTENSION}")
    }
}

/// Applies the per-character substitution cipher.
///
/// Code points in `[33, 126]` map to `33 + ((code + 14) mod 94)`; everything
/// else passes through unchanged.
fn rotate_char(c: char) -> char {
    let code = c as u32;
    if (CIPHER_LOW..=CIPHER_HIGH).contains(&code) {
        char::from_u32(CIPHER_LOW + (code + CIPHER_OFFSET) % CIPHER_MODULUS).unwrap_or(c)
    } else {
        c
    }
}
