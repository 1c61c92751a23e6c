// crates/lti-bridge-core/src/oauth/signature.rs
// ============================================================================
// Module: OAuth1 Signature Primitives
// Description: Base string construction and HMAC-SHA1 signing per RFC 5849.
// Purpose: Provide the shared primitives for launch signing and verification.
// Dependencies: base64, hmac, sha1, subtle, url
// ============================================================================

//! ## Overview
//! The signature base string is `METHOD&uri&params`, each component
//! percent-encoded, where `uri` is the normalized base string URI (no query,
//! no default port) and `params` is the sorted, encoded parameter list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::Hmac;
use hmac::Mac;
use sha1::Digest;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use url::Url;

use crate::oauth::OAuthError;
use crate::oauth::encoding::escape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signature method identifier for HMAC-SHA1.
pub const HMAC_SHA1: &str = "HMAC-SHA1";

/// HMAC-SHA1 MAC type.
type HmacSha1 = Hmac<Sha1>;

// ============================================================================
// SECTION: Base String
// ============================================================================

/// Normalizes a request URI into its RFC 5849 base string URI form.
///
/// # Errors
///
/// Returns [`OAuthError::InvalidUri`] when the URI has no scheme or host.
pub fn normalize_base_string_uri(uri: &str) -> Result<String, OAuthError> {
    let parsed = Url::parse(uri.trim()).map_err(|err| OAuthError::InvalidUri(err.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| OAuthError::InvalidUri("uri must include a host".to_string()))?;
    let port = parsed.port().map(|port| format!(":{port}")).unwrap_or_default();
    let path = if parsed.path().is_empty() { "/" } else { parsed.path() };
    Ok(format!("{}://{}{port}{path}", parsed.scheme(), host.to_ascii_lowercase()))
}

/// Returns the decoded query parameters of a URI.
///
/// # Errors
///
/// Returns [`OAuthError::InvalidUri`] when the URI cannot be parsed.
pub fn query_parameters(uri: &str) -> Result<Vec<(String, String)>, OAuthError> {
    let parsed = Url::parse(uri.trim()).map_err(|err| OAuthError::InvalidUri(err.to_string()))?;
    Ok(parsed.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect())
}

/// Encodes, sorts, and joins parameters into the normalized parameter string.
#[must_use]
pub fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(key, value)| (escape(key), escape(value))).collect();
    encoded.sort();
    encoded.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
}

/// Builds the signature base string.
#[must_use]
pub fn signature_base_string(method: &str, base_uri: &str, normalized_params: &str) -> String {
    format!(
        "{}&{}&{}",
        escape(&method.to_ascii_uppercase()),
        escape(base_uri),
        escape(normalized_params)
    )
}

// ============================================================================
// SECTION: HMAC-SHA1
// ============================================================================

/// Signs a base string with HMAC-SHA1 and returns the base64 signature.
///
/// The token secret is always empty for LTI 1.1 (two-legged OAuth).
#[must_use]
pub fn sign_hmac_sha1(base_string: &str, client_secret: &str) -> String {
    let key = format!("{}&", escape(client_secret));
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha1::new_from_slice(key.as_bytes()) else {
        return String::new();
    };
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Compares two signatures in constant time.
#[must_use]
pub fn signatures_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Computes the OAuth body hash (`base64(sha1(body))`).
#[must_use]
pub fn body_hash(body: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(body);
    STANDARD.encode(hasher.finalize())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
