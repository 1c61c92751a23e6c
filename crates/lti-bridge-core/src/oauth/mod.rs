// crates/lti-bridge-core/src/oauth/mod.rs
// ============================================================================
// Module: OAuth1 Signing and Verification
// Description: HMAC-SHA1 request signing and body-hash verification.
// Purpose: Authenticate launches and inbound grade callbacks.
// Dependencies: base64, hmac, sha1, subtle, url, rand
// ============================================================================

//! ## Overview
//! Two-legged OAuth1 as used by LTI 1.1: launches are signed as form posts,
//! and grade callbacks authenticate non-form bodies with the `oauth_body_hash`
//! extension. All checks fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod encoding;
pub mod header;
pub mod signature;
pub mod verifier;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::OAuthClient;
pub use client::OAuthStamp;
pub use verifier::BodySignatureVerifier;
pub use verifier::SignedRequest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// OAuth signing and verification errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OAuthError {
    /// Request or launch URI cannot be normalized.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    /// Authorization header absent.
    #[error("missing authorization header")]
    MissingHeader,
    /// Authorization header could not be parsed.
    #[error("malformed authorization header: {0}")]
    MalformedHeader(String),
    /// Required OAuth parameter absent.
    #[error("missing oauth parameter {0}")]
    MissingParameter(&'static str),
    /// Declared content type differs from the mandated one.
    #[error("content type must be {expected}, got {actual}")]
    ContentTypeMismatch {
        /// Mandated media type.
        expected: String,
        /// Media type sent by the caller.
        actual: String,
    },
    /// Body hash does not match the request body.
    #[error("OAuth body hash verification is failed.")]
    BodyHashMismatch,
    /// No shared secret is configured for the tool.
    #[error("no credentials configured for tool")]
    MissingCredentials,
    /// HMAC signature does not match.
    #[error("OAuth signature verification is failed.")]
    SignatureMismatch,
}
