// crates/lti-bridge-core/src/oauth/encoding.rs
// ============================================================================
// Module: OAuth Percent Encoding
// Description: RFC 5849 parameter encoding and URL path quoting helpers.
// Purpose: Keep every encoder used on the wire in one place.
// Dependencies: percent-encoding
// ============================================================================

//! ## Overview
//! OAuth1 requires RFC 3986 encoding where only `ALPHA / DIGIT / - . _ ~` are
//! left untouched, with uppercase hex digits. Launch identifiers use the same
//! set but additionally keep `/` so course paths stay readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters encoded in OAuth parameters (everything but unreserved).
const OAUTH_ENCODE_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Characters encoded when quoting identifiers (unreserved and `/` kept).
const QUOTE_ENCODE_SET: &AsciiSet = &OAUTH_ENCODE_SET.remove(b'/');

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Percent-encodes a value for use in an OAuth signature or header.
#[must_use]
pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Decodes a percent-encoded value; invalid UTF-8 is replaced lossily.
#[must_use]
pub fn unescape(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Quotes an identifier for inclusion in launch parameters.
#[must_use]
pub fn quote(value: &str) -> String {
    utf8_percent_encode(value, QUOTE_ENCODE_SET).to_string()
}

/// Reverses [`quote`].
#[must_use]
pub fn unquote(value: &str) -> String {
    unescape(value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
