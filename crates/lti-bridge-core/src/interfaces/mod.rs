// crates/lti-bridge-core/src/interfaces/mod.rs
// ============================================================================
// Module: LTI Bridge Interfaces
// Description: Contracts for the platform collaborators this subsystem uses.
// Purpose: Inject user lookup, grade ledger, caching, and course settings.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The bridge never reaches into platform storage directly. Course
//! credentials, user resolution, the grade ledger of record, and the local
//! grade cache are supplied through these traits so the signing and grading
//! components can be composed by explicit injection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::AnonymousUserId;
use crate::core::CourseId;
use crate::core::GradeKey;
use crate::core::GradeState;
use crate::core::PlatformRole;
use crate::core::RealUser;
use crate::core::ToolComponent;
use crate::core::UsageId;

// ============================================================================
// SECTION: Course Credentials
// ============================================================================

/// Supplies the ordered `"id:key:secret"` passports of a course.
pub trait CredentialSource: Send + Sync {
    /// Returns the passports configured for `course_id` (empty if none).
    fn course_credentials(&self, course_id: &CourseId) -> Vec<String>;
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// Resolves anonymous identifiers to platform users.
pub trait UserDirectory: Send + Sync {
    /// Returns the real user for `anonymous_id`, or `None` when unknown.
    fn resolve_real_user(&self, anonymous_id: &AnonymousUserId) -> Option<RealUser>;
}

// ============================================================================
// SECTION: Grade Ledger
// ============================================================================

/// Grade publication sent to the ledger of record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeEvent {
    /// Owning course.
    pub course_id: CourseId,
    /// Tool placement.
    pub usage_id: UsageId,
    /// Graded user.
    pub user: RealUser,
    /// Weighted score, or `None` to clear.
    pub value: Option<f64>,
    /// Maximum score, or `None` when clearing.
    pub max_value: Option<f64>,
}

/// Grade ledger errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Publishing did not complete.
    #[error("grade publish failed: {0}")]
    Publish(String),
}

/// Ledger of record for grades.
///
/// Publishing is synchronous: it returns only once the grade is durable or
/// definitively failed.
pub trait GradeLedger: Send + Sync {
    /// Publishes a grade change.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the grade could not be recorded.
    fn publish_grade(&self, event: &GradeEvent) -> Result<(), LedgerError>;
}

// ============================================================================
// SECTION: Grade State Cache
// ============================================================================

/// Grade state cache errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store reported an error.
    #[error("grade state store error: {0}")]
    Store(String),
}

/// Local cache of per-placement, per-user grade state.
pub trait GradeStateStore: Send + Sync {
    /// Loads grade state; absent entries yield the default state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn load(&self, key: &GradeKey) -> Result<GradeState, StoreError>;

    /// Replaces grade state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn save(&self, key: &GradeKey, state: &GradeState) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Launch Environment
// ============================================================================

/// Per-request facts about the launching user and platform.
pub trait LaunchEnvironment {
    /// Host name of the platform, used in `resource_link_id`.
    fn current_hostname(&self) -> String;

    /// Role of the launching user.
    fn current_user_role(&self) -> PlatformRole;

    /// Anonymous id of the launching user for this course.
    fn anonymous_user_id(&self) -> AnonymousUserId;

    /// Absolute URL of the v1.1 grade endpoint for `component`.
    fn outcome_service_url(&self, component: &ToolComponent) -> String;
}
