// crates/lti-bridge-core/src/core/credentials.rs
// ============================================================================
// Module: Credential Resolver
// Description: Course-level LTI passport parsing and key/secret lookup.
// Purpose: Map a tool identifier to its OAuth consumer key and secret.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Courses carry an ordered list of `"id:key:secret"` passports. Resolution
//! walks the list in order, rejects malformed entries as configuration errors,
//! and returns the first entry whose id matches. A missing match resolves to
//! empty credentials, which every signing and verification path treats as a
//! guaranteed failure rather than anonymous access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::identifiers::ToolId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Single parsed passport entry.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    /// Tool identifier the credentials belong to.
    pub tool_id: ToolId,
    /// OAuth consumer key.
    pub key: String,
    /// OAuth shared secret.
    pub secret: String,
}

impl CredentialEntry {
    /// Parses an `"id:key:secret"` passport string.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MalformedPassport`] unless the string splits
    /// into exactly three `:`-separated fields.
    pub fn parse(passport: &str) -> Result<Self, CredentialError> {
        let fields: Vec<&str> = passport.split(':').map(str::trim).collect();
        let [tool_id, key, secret] = fields.as_slice() else {
            return Err(CredentialError::MalformedPassport(format!("'{passport}'")));
        };
        Ok(Self {
            tool_id: ToolId::new(*tool_id),
            key: (*key).to_string(),
            secret: (*secret).to_string(),
        })
    }
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("tool_id", &self.tool_id)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Resolved OAuth consumer credentials.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ClientCredentials {
    /// OAuth consumer key (empty when unresolved).
    pub key: String,
    /// OAuth shared secret (empty when unresolved).
    pub secret: String,
}

impl ClientCredentials {
    /// Creates credentials from a key and secret.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Returns the "no credentials" sentinel.
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Returns true when no usable secret is available.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("key", &self.key)
            .field("secret", &if self.secret.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Credential resolution errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Passport does not split into `id:key:secret`.
    #[error("could not parse LTI passport: {0}. Should be \"id:key:secret\" string.")]
    MalformedPassport(String),
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the credentials for `tool_id` from an ordered passport list.
///
/// Entries are examined in order; a malformed entry encountered before a match
/// aborts resolution.
///
/// # Errors
///
/// Returns [`CredentialError::MalformedPassport`] for a malformed entry.
pub fn resolve_client_credentials<S: AsRef<str>>(
    tool_id: &ToolId,
    passports: &[S],
) -> Result<ClientCredentials, CredentialError> {
    let wanted = tool_id.as_str().trim();
    for passport in passports {
        let entry = CredentialEntry::parse(passport.as_ref())?;
        if entry.tool_id.as_str() == wanted {
            return Ok(ClientCredentials::new(entry.key, entry.secret));
        }
    }
    Ok(ClientCredentials::missing())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
