// crates/lti-bridge-core/src/lib.rs
// ============================================================================
// Module: LTI Bridge Core Library
// Description: Public API surface for the LTI bridge core.
// Purpose: Expose launch signing, grade sync handlers, and collaborator contracts.
// Dependencies: crate::{core, error, interfaces, launch, oauth, outcomes, runtime}
// ============================================================================

//! ## Overview
//! LTI bridge core lets a course platform launch external tools with an
//! OAuth1-signed form and accept grades back through the LTI 1.1 XML
//! passback and LTI 2.0 JSON result service. Storage, user lookup, and the
//! grade ledger are reached only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod error;
pub mod interfaces;
pub mod launch;
pub mod oauth;
pub mod outcomes;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use error::LtiError;
pub use interfaces::CredentialSource;
pub use interfaces::GradeEvent;
pub use interfaces::GradeLedger;
pub use interfaces::GradeStateStore;
pub use interfaces::LaunchEnvironment;
pub use interfaces::LedgerError;
pub use interfaces::StoreError;
pub use interfaces::UserDirectory;
pub use launch::FallbackReason;
pub use launch::LaunchSignature;
pub use launch::LaunchSigner;
pub use launch::LaunchView;
pub use launch::SignedLaunch;
pub use oauth::BodySignatureVerifier;
pub use oauth::OAuthClient;
pub use oauth::OAuthError;
pub use oauth::OAuthStamp;
pub use oauth::SignedRequest;
pub use outcomes::GradeSyncContext;
pub use outcomes::PassbackAction;
pub use outcomes::PassbackReply;
pub use outcomes::ResultOutcome;
pub use outcomes::ResultReply;
pub use outcomes::passback::LTI_1_1_NAMESPACE;
pub use outcomes::passback::XML_CONTENT_TYPE;
pub use outcomes::result_service::RESULT_CONTENT_TYPE;
pub use outcomes::result_service::RESULT_CONTEXT;
pub use runtime::GradeKeeper;
pub use runtime::InMemoryGradeLedger;
pub use runtime::InMemoryGradeStateStore;
pub use runtime::InMemoryUserDirectory;
pub use runtime::LtiService;
pub use runtime::StaticCredentialSource;
pub use runtime::service::AuthorizationHint;
