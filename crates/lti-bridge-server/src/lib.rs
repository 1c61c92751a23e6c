// crates/lti-bridge-server/src/lib.rs
// ============================================================================
// Module: LTI Bridge Server Library
// Description: HTTP transport and audit logging for the LTI bridge.
// Purpose: Expose the axum server and audit sinks.
// Dependencies: crate::{audit, server}
// ============================================================================

//! ## Overview
//! Hosts the LTI bridge over HTTP. Handlers delegate to
//! [`lti_bridge_core::LtiService`] and record one audit event per request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuthorizationHintEvent;
pub use audit::FileAuditSink;
pub use audit::LtiAuditEvent;
pub use audit::LtiAuditSink;
pub use audit::LtiEndpoint;
pub use audit::LtiOutcome;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use server::ANONYMOUS_USER_HEADER;
pub use server::HttpLaunchEnvironment;
pub use server::LtiEndpointEntry;
pub use server::LtiServer;
pub use server::LtiServerError;
pub use server::USER_ROLE_HEADER;
pub use server::grade_handler_url;
pub use server::result_service_url;
