// crates/lti-bridge-server/src/audit.rs
// ============================================================================
// Module: LTI Audit Logging
// Description: Structured audit events for LTI request handling.
// Purpose: Emit redacted JSON-line audit records without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every handled request produces one [`LtiAuditEvent`]. Records never carry
//! request bodies, secrets, or Authorization headers; failure detail that
//! the LTI wire contracts forbid returning to the tool is recorded here
//! instead. The authorization hint event is only emitted when explicitly
//! enabled in configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Endpoint classification for audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LtiEndpoint {
    /// Launch form construction.
    Launch,
    /// LTI 1.1 XML grade passback.
    GradePassback,
    /// LTI 2.0 JSON result service.
    ResultService,
    /// Course endpoint discovery.
    Endpoints,
}

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LtiOutcome {
    /// Request applied.
    Success,
    /// Well-formed request for an unimplemented action.
    Unsupported,
    /// Request rejected.
    Rejected,
}

/// LTI request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LtiAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Endpoint handling the request.
    pub endpoint: LtiEndpoint,
    /// Course identifier from the path.
    pub course_id: String,
    /// Placement identifier from the path, when routed to one.
    pub usage_id: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Request outcome.
    pub outcome: LtiOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Failure detail withheld from the tool.
    pub reason: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Inputs required to construct an audit event.
pub struct LtiAuditEventParams {
    /// Endpoint handling the request.
    pub endpoint: LtiEndpoint,
    /// Course identifier from the path.
    pub course_id: String,
    /// Placement identifier from the path.
    pub usage_id: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Request outcome.
    pub outcome: LtiOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Failure detail withheld from the tool.
    pub reason: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl LtiAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: LtiAuditEventParams) -> Self {
        Self {
            event: "lti_request",
            timestamp_ms: now_ms(),
            endpoint: params.endpoint,
            course_id: params.course_id,
            usage_id: params.usage_id,
            method: params.method,
            outcome: params.outcome,
            status: params.status,
            error_kind: params.error_kind,
            reason: params.reason,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

/// Debug record of the Authorization header a tool should have sent.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationHintEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Course identifier.
    pub course_id: String,
    /// Placement identifier.
    pub usage_id: String,
    /// `oauth_body_hash` of the received body.
    pub oauth_body_hash: String,
    /// Correctly signed Authorization header for the received request.
    pub authorization: String,
}

impl AuthorizationHintEvent {
    /// Creates a hint event.
    #[must_use]
    pub fn new(course_id: String, usage_id: String, oauth_body_hash: String, authorization: String) -> Self {
        Self {
            event: "lti_authorization_hint",
            timestamp_ms: now_ms(),
            course_id,
            usage_id,
            oauth_body_hash,
            authorization,
        }
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for LTI request logging.
pub trait LtiAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &LtiAuditEvent);

    /// Record an authorization hint.
    fn record_hint(&self, _event: &AuthorizationHintEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl LtiAuditSink for StderrAuditSink {
    fn record(&self, event: &LtiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_hint(&self, event: &AuthorizationHintEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one serialized record.
    fn write_line(&self, payload: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl LtiAuditSink for FileAuditSink {
    fn record(&self, event: &LtiAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.write_line(&payload);
        }
    }

    fn record_hint(&self, event: &AuthorizationHintEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.write_line(&payload);
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl LtiAuditSink for NoopAuditSink {
    fn record(&self, _event: &LtiAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
