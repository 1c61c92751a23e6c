// crates/lti-bridge-core/src/oauth/verifier.rs
// ============================================================================
// Module: OAuth1 Body Verifier
// Description: Verifies body-signed OAuth1 requests from tool providers.
// Purpose: Authenticate grade callbacks before any state is touched.
// Dependencies: crate::oauth::{header, signature}
// ============================================================================

//! ## Overview
//! Verification runs the cheap checks first and stops at the first failure:
//! mandated content type, then body hash, then the HMAC-SHA1 signature over
//! the header parameters. Missing credentials always fail; an empty secret is
//! never treated as anonymous access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::credentials::ClientCredentials;
use crate::oauth::OAuthError;
use crate::oauth::header::parse_authorization_header;
use crate::oauth::signature::body_hash;
use crate::oauth::signature::normalize_base_string_uri;
use crate::oauth::signature::normalize_parameters;
use crate::oauth::signature::sign_hmac_sha1;
use crate::oauth::signature::signature_base_string;
use crate::oauth::signature::signatures_match;

// ============================================================================
// SECTION: Request View
// ============================================================================

/// Transport-neutral view of an inbound signed request.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Absolute request URL as seen by the tool.
    pub url: &'a str,
    /// `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// `Content-Type` header value.
    pub content_type: Option<&'a str>,
    /// Raw request body.
    pub body: &'a [u8],
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifies OAuth1 body-signed requests against one shared secret.
#[derive(Debug, Clone, Copy)]
pub struct BodySignatureVerifier<'a> {
    /// Credentials resolved for the tool.
    credentials: &'a ClientCredentials,
    /// Media type the request must declare, when mandated.
    required_content_type: Option<&'a str>,
}

impl<'a> BodySignatureVerifier<'a> {
    /// Creates a verifier without a content-type requirement.
    #[must_use]
    pub const fn new(credentials: &'a ClientCredentials) -> Self {
        Self {
            credentials,
            required_content_type: None,
        }
    }

    /// Requires the request to declare exactly `content_type`.
    #[must_use]
    pub const fn with_content_type(mut self, content_type: &'a str) -> Self {
        self.required_content_type = Some(content_type);
        self
    }

    /// Verifies the request.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`OAuthError`].
    pub fn verify(&self, request: &SignedRequest<'_>) -> Result<(), OAuthError> {
        if let Some(expected) = self.required_content_type {
            let actual = request.content_type.unwrap_or_default();
            if actual != expected {
                return Err(OAuthError::ContentTypeMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let header = request.authorization.ok_or(OAuthError::MissingHeader)?;
        let mut params = parse_authorization_header(header)?;
        let position = params
            .iter()
            .position(|(name, _)| name == "oauth_signature")
            .ok_or(OAuthError::MissingParameter("oauth_signature"))?;
        let (_, provided_signature) = params.remove(position);

        let declared_hash = params
            .iter()
            .find(|(name, _)| name == "oauth_body_hash")
            .map(|(_, value)| value.as_str())
            .ok_or(OAuthError::BodyHashMismatch)?;
        if !signatures_match(&body_hash(request.body), declared_hash) {
            return Err(OAuthError::BodyHashMismatch);
        }

        if self.credentials.is_missing() {
            return Err(OAuthError::MissingCredentials);
        }
        if provided_signature.is_empty() {
            return Err(OAuthError::SignatureMismatch);
        }
        let base_uri = normalize_base_string_uri(request.url)?;
        let base = signature_base_string(request.method, &base_uri, &normalize_parameters(&params));
        let expected = sign_hmac_sha1(&base, &self.credentials.secret);
        if signatures_match(&expected, &provided_signature) {
            Ok(())
        } else {
            Err(OAuthError::SignatureMismatch)
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
