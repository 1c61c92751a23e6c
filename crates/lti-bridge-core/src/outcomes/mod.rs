// crates/lti-bridge-core/src/outcomes/mod.rs
// ============================================================================
// Module: Grade Sync Handlers
// Description: LTI 1.1 XML grade passback and LTI 2.0 JSON result service.
// Purpose: Turn authenticated tool callbacks into grade-state mutations.
// Dependencies: crate::core, crate::oauth, crate::runtime
// ============================================================================

//! ## Overview
//! Both handlers share the same collaborators, bundled in
//! [`GradeSyncContext`]: the placement, its resolved credentials, the user
//! directory, and a [`GradeKeeper`] bound to the ledger and cache. Neither
//! handler returns an error to its caller; every outcome is a well-formed
//! reply carrying the classified result for auditing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod passback;
pub mod result_service;

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ClientCredentials;
use crate::core::ToolComponent;
use crate::interfaces::UserDirectory;
use crate::runtime::GradeKeeper;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use passback::PassbackAction;
pub use passback::PassbackReply;
pub use passback::handle_grade_passback;
pub use result_service::ResultOutcome;
pub use result_service::ResultReply;
pub use result_service::handle_result_request;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Collaborators needed to apply a grade callback for one placement.
pub struct GradeSyncContext<'a> {
    /// Placement receiving the grade.
    pub component: &'a ToolComponent,
    /// Credentials resolved for the placement's tool id.
    pub credentials: &'a ClientCredentials,
    /// Anonymous-id resolution.
    pub users: &'a dyn UserDirectory,
    /// Publish-then-cache grade writer.
    pub grades: GradeKeeper<'a>,
}
