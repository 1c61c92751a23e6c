// crates/lti-bridge-core/src/oauth/client.rs
// ============================================================================
// Module: OAuth1 Client
// Description: Produces signed OAuth1 protocol parameters for outgoing data.
// Purpose: Sign launch forms and body-signed grade requests.
// Dependencies: rand, crate::oauth::signature
// ============================================================================

//! ## Overview
//! [`OAuthClient`] signs with HMAC-SHA1 using a consumer key and shared
//! secret. Nonce and timestamp are supplied by an [`OAuthStamp`], which is
//! generated from the clock and a random source in production and fixed in
//! tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::credentials::ClientCredentials;
use crate::oauth::OAuthError;
use crate::oauth::header::render_authorization_header;
use crate::oauth::signature::HMAC_SHA1;
use crate::oauth::signature::body_hash;
use crate::oauth::signature::normalize_base_string_uri;
use crate::oauth::signature::normalize_parameters;
use crate::oauth::signature::query_parameters;
use crate::oauth::signature::sign_hmac_sha1;
use crate::oauth::signature::signature_base_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// OAuth protocol version sent with every request.
pub const OAUTH_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Stamp
// ============================================================================

/// Nonce and timestamp pair for one signed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthStamp {
    /// Single-use nonce.
    pub nonce: String,
    /// Seconds since the Unix epoch.
    pub timestamp: String,
}

impl OAuthStamp {
    /// Creates a stamp from explicit values.
    #[must_use]
    pub fn new(nonce: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Generates a fresh stamp from the system clock and a random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
            .to_string();
        let nonce = format!("{}{timestamp}", rand::random::<u64>());
        Self {
            nonce,
            timestamp,
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HMAC-SHA1 OAuth1 client bound to one set of consumer credentials.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Consumer key and secret.
    credentials: ClientCredentials,
}

impl OAuthClient {
    /// Creates a client for the given credentials.
    #[must_use]
    pub const fn new(credentials: ClientCredentials) -> Self {
        Self {
            credentials,
        }
    }

    /// Returns the consumer credentials.
    #[must_use]
    pub const fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Returns the unsigned protocol parameters in header order.
    fn protocol_params(&self, stamp: &OAuthStamp) -> Vec<(String, String)> {
        vec![
            ("oauth_nonce".to_string(), stamp.nonce.clone()),
            ("oauth_timestamp".to_string(), stamp.timestamp.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
            ("oauth_signature_method".to_string(), HMAC_SHA1.to_string()),
            ("oauth_consumer_key".to_string(), self.credentials.key.clone()),
        ]
    }

    /// Signs a form-encoded request.
    ///
    /// The signature covers the protocol parameters, any query parameters of
    /// `uri`, and every body parameter. Returns the protocol parameters with
    /// `oauth_signature` appended; values are not percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidUri`] when `uri` lacks a scheme or host.
    pub fn sign_form(
        &self,
        method: &str,
        uri: &str,
        body: &[(String, String)],
        stamp: &OAuthStamp,
    ) -> Result<Vec<(String, String)>, OAuthError> {
        let base_uri = normalize_base_string_uri(uri)?;
        let mut protocol = self.protocol_params(stamp);
        let mut signed = protocol.clone();
        signed.extend(query_parameters(uri)?);
        signed.extend(body.iter().cloned());
        let base = signature_base_string(method, &base_uri, &normalize_parameters(&signed));
        protocol.push(("oauth_signature".to_string(), sign_hmac_sha1(&base, &self.credentials.secret)));
        Ok(protocol)
    }

    /// Builds a body-signed Authorization header for a non-form request.
    ///
    /// Only the header parameters (including `oauth_body_hash`) are signed
    /// over the URI exactly as written, matching what
    /// [`crate::oauth::BodySignatureVerifier`] checks.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidUri`] when `uri` lacks a scheme or host.
    pub fn sign_body(
        &self,
        method: &str,
        uri: &str,
        body: &[u8],
        stamp: &OAuthStamp,
    ) -> Result<String, OAuthError> {
        let base_uri = normalize_base_string_uri(uri)?;
        let mut params = self.protocol_params(stamp);
        params.push(("oauth_body_hash".to_string(), body_hash(body)));
        let base = signature_base_string(method, &base_uri, &normalize_parameters(&params));
        params.push(("oauth_signature".to_string(), sign_hmac_sha1(&base, &self.credentials.secret)));
        Ok(render_authorization_header(&params))
    }
}
