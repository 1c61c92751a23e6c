// crates/lti-bridge-core/src/core/mod.rs
// ============================================================================
// Module: LTI Bridge Core Types
// Description: Domain model for tool placements, credentials, and grades.
// Purpose: Group the data types shared by the signing and grading flows.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types describe tool configuration, course credentials, per-launch
//! context, and the cached grade state for a single placement/user pair.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod grade;
pub mod identifiers;
pub mod tool;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::ClientCredentials;
pub use credentials::CredentialEntry;
pub use credentials::CredentialError;
pub use credentials::resolve_client_credentials;
pub use grade::GradeKey;
pub use grade::GradeState;
pub use grade::RawScore;
pub use grade::ScoreError;
pub use identifiers::AnonymousUserId;
pub use identifiers::CourseId;
pub use identifiers::RealUser;
pub use identifiers::ToolId;
pub use identifiers::UsageId;
pub use tool::LaunchContext;
pub use tool::LtiRole;
pub use tool::PlatformRole;
pub use tool::ToolComponent;
pub use tool::ToolConfiguration;
