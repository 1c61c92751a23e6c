// crates/lti-bridge-core/src/oauth/header.rs
// ============================================================================
// Module: OAuth Authorization Header
// Description: Parsing and rendering of `Authorization: OAuth ...` headers.
// Purpose: Extract signed protocol parameters from inbound requests.
// Dependencies: crate::oauth::encoding
// ============================================================================

//! ## Overview
//! The header carries comma-separated `name="value"` pairs after the `OAuth`
//! scheme token. Names and values are percent-decoded on parse and encoded on
//! render. The `realm` parameter is not part of the signature and is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::oauth::OAuthError;
use crate::oauth::encoding::escape;
use crate::oauth::encoding::unescape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted Authorization header length in bytes.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an OAuth Authorization header into decoded parameter pairs.
///
/// # Errors
///
/// Returns [`OAuthError::MalformedHeader`] when the scheme is not `OAuth`, the
/// header is oversized, or a parameter is not of the form `name="value"`.
pub fn parse_authorization_header(header: &str) -> Result<Vec<(String, String)>, OAuthError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(OAuthError::MalformedHeader("authorization header too large".to_string()));
    }
    let trimmed = header.trim();
    let (scheme, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    if !scheme.eq_ignore_ascii_case("oauth") {
        return Err(OAuthError::MalformedHeader("authorization scheme is not OAuth".to_string()));
    }
    let mut params = Vec::new();
    for item in rest.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (name, value) = item
            .split_once('=')
            .ok_or_else(|| OAuthError::MalformedHeader(format!("invalid parameter '{item}'")))?;
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(value);
        let name = unescape(name.trim());
        if name == "realm" {
            continue;
        }
        params.push((name, unescape(value)));
    }
    Ok(params)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders parameter pairs as an OAuth Authorization header value.
#[must_use]
pub fn render_authorization_header(params: &[(String, String)]) -> String {
    let rendered = params
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", escape(name), escape(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {rendered}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
