// crates/lti-bridge-core/src/runtime/mod.rs
// ============================================================================
// Module: LTI Bridge Runtime
// Description: Grade application, request handling facade, and in-memory backends.
// Purpose: Compose the signer and grade handlers over injected collaborators.
// Dependencies: crate::core, crate::interfaces, crate::outcomes
// ============================================================================

//! ## Overview
//! The runtime wires the launch signer and both grade-sync handlers to the
//! collaborator interfaces. No state is shared between requests beyond what
//! the injected ledger and cache hold.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod grades;
pub mod memory;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use grades::GradeKeeper;
pub use memory::InMemoryGradeLedger;
pub use memory::InMemoryGradeStateStore;
pub use memory::InMemoryUserDirectory;
pub use memory::StaticCredentialSource;
pub use service::LtiService;
