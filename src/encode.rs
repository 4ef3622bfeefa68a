use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except ASCII alphanumerics and `_ - ~ .` is escaped.
const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'~')
    .remove(b'.');

/// As `ENCODE_SET`, but `/` passes through.
const ENCODE_SET_KEEP_SLASH: &AsciiSet = &ENCODE_SET.remove(b'/');

/// Percent-encodes `input` the way the platform's verifier does.
///
/// Unreserved characters are kept, every other byte of the UTF-8 encoding
/// becomes `%XX` with uppercase hex digits. `/` is only escaped when
/// `encode_slash` is set, which is the case for query and body keys and
/// values but not for the request URL itself.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let set = if encode_slash {
        ENCODE_SET
    } else {
        ENCODE_SET_KEEP_SLASH
    };
    utf8_percent_encode(input, set).to_string()
}
