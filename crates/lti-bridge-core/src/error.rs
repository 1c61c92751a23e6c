// crates/lti-bridge-core/src/error.rs
// ============================================================================
// Module: LTI Bridge Errors
// Description: Error taxonomy shared by launch and grade-sync flows.
// Purpose: Classify failures so callers can pick the mandated response.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every failure in the subsystem collapses into one [`LtiError`] kind. None
//! is fatal: callers turn each kind into a well-formed envelope or status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::CredentialError;
use crate::core::ScoreError;
use crate::interfaces::LedgerError;
use crate::interfaces::StoreError;
use crate::oauth::OAuthError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error taxonomy for LTI operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LtiError {
    /// Course author configuration is invalid (passports, custom parameters,
    /// unscored placement receiving grades).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Inbound XML/JSON is malformed or fails field validation.
    #[error("protocol parse error: {0}")]
    ProtocolParse(String),
    /// Content type, body hash, or signature check failed.
    #[error("authentication error: {0}")]
    Authentication(String),
    /// Anonymous id does not map to a real user.
    #[error("user resolution error: {0}")]
    UserResolution(String),
    /// Grade ledger did not accept the publish.
    #[error("ledger error: {0}")]
    Ledger(String),
    /// Local grade cache unavailable.
    #[error("store error: {0}")]
    Store(String),
}

impl LtiError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ProtocolParse(_) => "protocol_parse",
            Self::Authentication(_) => "authentication",
            Self::UserResolution(_) => "user_resolution",
            Self::Ledger(_) => "ledger",
            Self::Store(_) => "store",
        }
    }
}

impl From<CredentialError> for LtiError {
    fn from(err: CredentialError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<OAuthError> for LtiError {
    fn from(err: OAuthError) -> Self {
        Self::Authentication(err.to_string())
    }
}

impl From<ScoreError> for LtiError {
    fn from(err: ScoreError) -> Self {
        Self::ProtocolParse(err.to_string())
    }
}

impl From<LedgerError> for LtiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err.to_string())
    }
}

impl From<StoreError> for LtiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
