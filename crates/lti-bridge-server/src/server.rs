// crates/lti-bridge-server/src/server.rs
// ============================================================================
// Module: LTI HTTP Server
// Description: axum transport for launch, grade callbacks, and discovery.
// Purpose: Route HTTP requests into the LTI service and audit every exchange.
// Dependencies: axum, lti-bridge-config, lti-bridge-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! The server exposes four route families per tool placement:
//! - `GET  /courses/{course}/tools/{usage}/launch` returns the signed launch
//!   form and its render context as JSON.
//! - `POST /courses/{course}/tools/{usage}/grade_handler` accepts LTI 1.1 XML
//!   passback and always answers HTTP 200 with an XML envelope.
//! - `/courses/{course}/tools/{usage}/lti_2_0_result_rest_handler/user/{id}`
//!   serves the LTI 2.0 JSON result service.
//! - `GET  /courses/{course}/lti_endpoints` lists grade endpoints of the
//!   course's scored placements.
//!
//! Signatures are verified against `public_base_url` joined with the request
//! path and query, which is the URL the tool signed.
//!
//! Security posture: grade callback bodies and headers are untrusted; failure
//! detail is written to the audit sink only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::body::HttpBody;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use axum::routing::get;
use axum::routing::post;
use lti_bridge_config::LtiBridgeConfig;
use lti_bridge_config::MAX_BODY_BYTES_LIMIT;
use lti_bridge_core::AnonymousUserId;
use lti_bridge_core::InMemoryGradeLedger;
use lti_bridge_core::InMemoryGradeStateStore;
use lti_bridge_core::LaunchEnvironment;
use lti_bridge_core::LtiService;
use lti_bridge_core::OAuthStamp;
use lti_bridge_core::PassbackAction;
use lti_bridge_core::PassbackReply;
use lti_bridge_core::PlatformRole;
use lti_bridge_core::RESULT_CONTENT_TYPE;
use lti_bridge_core::SignedRequest;
use lti_bridge_core::ToolComponent;
use lti_bridge_core::XML_CONTENT_TYPE;
use lti_bridge_core::oauth::encoding::escape;
use lti_bridge_core::oauth::header::parse_authorization_header;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::audit::AuthorizationHintEvent;
use crate::audit::FileAuditSink;
use crate::audit::LtiAuditEvent;
use crate::audit::LtiAuditEventParams;
use crate::audit::LtiAuditSink;
use crate::audit::LtiEndpoint;
use crate::audit::LtiOutcome;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the launching user's anonymous id.
pub const ANONYMOUS_USER_HEADER: &str = "x-lti-anonymous-user";

/// Header carrying the launching user's platform role.
pub const USER_ROLE_HEADER: &str = "x-lti-user-role";

/// Path segment of the v1.1 handler.
const GRADE_HANDLER: &str = "grade_handler";

/// Path segment of the v2.0 handler.
const RESULT_HANDLER: &str = "lti_2_0_result_rest_handler";

/// Template suffix advertised for the v2.0 handler.
const RESULT_USER_TEMPLATE: &str = "user/{anon_user_id}";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum LtiServerError {
    /// Configuration rejected.
    #[error("config error: {0}")]
    Config(String),
    /// Startup failed.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or connection failure.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// LTI bridge HTTP server.
pub struct LtiServer {
    /// Shared handler state.
    state: Arc<ServerState>,
}

/// State shared by every handler.
pub(crate) struct ServerState {
    /// Validated configuration.
    pub(crate) config: LtiBridgeConfig,
    /// LTI operations over the configured collaborators.
    pub(crate) service: LtiService,
    /// Audit sink.
    pub(crate) audit: Arc<dyn LtiAuditSink>,
}

impl LtiServer {
    /// Builds a server backed by in-memory grade storage.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError`] when the configuration is invalid or the
    /// audit log cannot be opened.
    pub fn from_config(config: LtiBridgeConfig) -> Result<Self, LtiServerError> {
        let audit = build_audit_sink(&config)?;
        let service = LtiService::new(
            Arc::new(config.credential_source()),
            Arc::new(config.user_directory()),
            Arc::new(InMemoryGradeLedger::new()),
            Arc::new(InMemoryGradeStateStore::new()),
        );
        Self::with_service(config, service, audit)
    }

    /// Builds a server over an externally constructed service and sink.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError::Config`] when the configuration is invalid.
    pub fn with_service(
        config: LtiBridgeConfig,
        service: LtiService,
        audit: Arc<dyn LtiAuditSink>,
    ) -> Result<Self, LtiServerError> {
        config.validate().map_err(|err| LtiServerError::Config(err.to_string()))?;
        Ok(Self {
            state: Arc::new(ServerState {
                config,
                service,
                audit,
            }),
        })
    }

    /// Returns the configured router.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), LtiServerError> {
        let addr =
            self.state.config.server.bind_addr().map_err(|err| LtiServerError::Config(err.to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| LtiServerError::Transport(format!("bind {addr} failed: {err}")))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`LtiServerError::Transport`] when serving fails.
    pub async fn serve_listener(self, listener: tokio::net::TcpListener) -> Result<(), LtiServerError> {
        let app = self.router();
        axum::serve(listener, app).await.map_err(|err| LtiServerError::Transport(err.to_string()))
    }
}

/// Selects the audit sink described by configuration.
fn build_audit_sink(config: &LtiBridgeConfig) -> Result<Arc<dyn LtiAuditSink>, LtiServerError> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(std::path::Path::new(path))
                .map_err(|err| LtiServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Builds the HTTP router over shared state.
pub(crate) fn build_router(state: Arc<ServerState>) -> Router {
    // Bodies are capped again per request against `max_body_bytes` so that
    // v1.1 callers still receive an XML envelope.
    Router::new()
        .route("/courses/{course_id}/tools/{usage_id}/launch", get(handle_launch))
        .route("/courses/{course_id}/tools/{usage_id}/grade_handler", post(handle_grade_passback))
        .route(
            "/courses/{course_id}/tools/{usage_id}/lti_2_0_result_rest_handler",
            any(handle_result_service_root),
        )
        .route(
            "/courses/{course_id}/tools/{usage_id}/lti_2_0_result_rest_handler/{*suffix}",
            any(handle_result_service),
        )
        .route("/courses/{course_id}/lti_endpoints", get(handle_endpoints))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES_LIMIT))
        .with_state(state)
}

// ============================================================================
// SECTION: URLs
// ============================================================================

/// Returns the absolute URL of a placement handler.
fn handler_url(base_url: &str, course_id: &str, usage_id: &str, handler: &str) -> String {
    format!("{base_url}/courses/{}/tools/{}/{handler}", escape(course_id), escape(usage_id))
}

/// Returns the absolute v1.1 grade handler URL of a placement.
#[must_use]
pub fn grade_handler_url(base_url: &str, component: &ToolComponent) -> String {
    handler_url(base_url, component.course_id.as_str(), component.usage_id.as_str(), GRADE_HANDLER)
}

/// Returns the absolute v2.0 result service URL of a placement's user.
#[must_use]
pub fn result_service_url(base_url: &str, component: &ToolComponent, user_suffix: &str) -> String {
    let handler = format!("{RESULT_HANDLER}/{user_suffix}");
    handler_url(base_url, component.course_id.as_str(), component.usage_id.as_str(), &handler)
}

/// Reconstructs the URL the tool signed.
fn request_url(base_url: &str, uri: &Uri) -> String {
    let path = uri.path_and_query().map_or_else(|| uri.path(), |value| value.as_str());
    format!("{base_url}{path}")
}

// ============================================================================
// SECTION: Launch Environment
// ============================================================================

/// Launch environment derived from an HTTP request and configuration.
#[derive(Debug, Clone)]
pub struct HttpLaunchEnvironment {
    /// Platform host name.
    pub hostname: String,
    /// Role of the launching user.
    pub role: PlatformRole,
    /// Anonymous id of the launching user.
    pub anonymous_id: AnonymousUserId,
    /// Public base URL without trailing slash.
    pub base_url: String,
}

impl LaunchEnvironment for HttpLaunchEnvironment {
    fn current_hostname(&self) -> String {
        self.hostname.clone()
    }

    fn current_user_role(&self) -> PlatformRole {
        self.role
    }

    fn anonymous_user_id(&self) -> AnonymousUserId {
        self.anonymous_id.clone()
    }

    fn outcome_service_url(&self, component: &ToolComponent) -> String {
        grade_handler_url(&self.base_url, component)
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Launch handler.
pub(crate) async fn handle_launch(
    State(state): State<Arc<ServerState>>,
    Path((course_id, usage_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut audit = AuditScope::new(LtiEndpoint::Launch, &course_id, Some(&usage_id), "GET", 0);
    let Some(component) = state.config.tool_component(&course_id, &usage_id) else {
        return audit.finish(&state, not_found("unknown tool placement"));
    };
    let Some(anonymous_id) = header_str(&headers, ANONYMOUS_USER_HEADER).filter(|id| !id.is_empty())
    else {
        audit.reject("missing_user", format!("missing {ANONYMOUS_USER_HEADER} header"));
        return audit.finish(&state, StatusCode::BAD_REQUEST.into_response());
    };
    let role = header_str(&headers, USER_ROLE_HEADER).map_or(PlatformRole::Student, PlatformRole::from_label);
    let env = HttpLaunchEnvironment {
        hostname: state.config.server.effective_hostname(),
        role,
        anonymous_id: AnonymousUserId::new(anonymous_id),
        base_url: state.config.server.base_url().to_string(),
    };

    match state.service.launch(&component, &env, &OAuthStamp::generate()) {
        Ok(view) => audit.finish(&state, json_response(StatusCode::OK, &view)),
        Err(err) => {
            let body = json!({ "error": err.to_string() });
            audit.reject(err.kind_label(), err.to_string());
            audit.finish(&state, json_response(StatusCode::INTERNAL_SERVER_ERROR, &body))
        }
    }
}

/// LTI 1.1 grade passback handler.
pub(crate) async fn handle_grade_passback(
    State(state): State<Arc<ServerState>>,
    Path((course_id, usage_id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut audit =
        AuditScope::new(LtiEndpoint::GradePassback, &course_id, Some(&usage_id), "POST", body.len());
    let Some(component) = state.config.tool_component(&course_id, &usage_id) else {
        return audit.finish(&state, not_found("unknown tool placement"));
    };

    let limit = state.config.server.max_body_bytes;
    let reply = if body.len() > limit {
        PassbackReply::body_too_large(limit)
    } else {
        let url = request_url(state.config.server.base_url(), &uri);
        let request = signed_request("POST", &url, &headers, &body);
        state.service.grade_passback(&component, &request)
    };

    match &reply.result {
        Ok(PassbackAction::Replaced {
            ..
        }) => {}
        Ok(PassbackAction::Unsupported {
            action,
        }) => audit.unsupported(format!("unsupported action {action}")),
        Err(err) => audit.reject(err.kind_label(), err.to_string()),
    }
    let mut response = (StatusCode::OK, reply.envelope).into_response();
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
    audit.finish(&state, response)
}

/// LTI 2.0 result service handler with a suffix.
pub(crate) async fn handle_result_service(
    State(state): State<Arc<ServerState>>,
    Path((course_id, usage_id, suffix)): Path<(String, String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parts = RequestParts {
        method: &method,
        uri: &uri,
        headers: &headers,
        body: &body,
    };
    result_service(&state, &course_id, &usage_id, &suffix, &parts)
}

/// LTI 2.0 result service handler without a suffix.
pub(crate) async fn handle_result_service_root(
    State(state): State<Arc<ServerState>>,
    Path((course_id, usage_id)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parts = RequestParts {
        method: &method,
        uri: &uri,
        headers: &headers,
        body: &body,
    };
    result_service(&state, &course_id, &usage_id, "", &parts)
}

/// Borrowed parts of an inbound grade callback.
struct RequestParts<'a> {
    /// HTTP method.
    method: &'a Method,
    /// Request URI (path and query).
    uri: &'a Uri,
    /// Request headers.
    headers: &'a HeaderMap,
    /// Raw body.
    body: &'a Bytes,
}

/// Shared v2.0 handling.
fn result_service(
    state: &ServerState,
    course_id: &str,
    usage_id: &str,
    suffix: &str,
    parts: &RequestParts<'_>,
) -> Response {
    let mut audit = AuditScope::new(
        LtiEndpoint::ResultService,
        course_id,
        Some(usage_id),
        parts.method.as_str(),
        parts.body.len(),
    );
    let Some(component) = state.config.tool_component(course_id, usage_id) else {
        return audit.finish(state, not_found("unknown tool placement"));
    };
    let limit = state.config.server.max_body_bytes;
    if parts.body.len() > limit {
        audit.reject("protocol_parse", format!("request body exceeds {limit} bytes"));
        return audit.finish(state, StatusCode::NOT_FOUND.into_response());
    }

    let url = request_url(state.config.server.base_url(), parts.uri);
    let request = signed_request(parts.method.as_str(), &url, parts.headers, parts.body);
    if state.config.server.debug_authorization_hint {
        record_authorization_hint(state, &component, &request);
    }

    let reply = state.service.result_service(&component, suffix, &request);
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if let Err(err) = &reply.outcome {
        audit.reject(err.kind_label(), err.to_string());
    }
    let response = match reply.body {
        Some(json_body) => {
            let mut response = (status, json_body).into_response();
            response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(RESULT_CONTENT_TYPE));
            response
        }
        None => status.into_response(),
    };
    audit.finish(state, response)
}

/// Endpoint discovery entry for one scored placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LtiEndpointEntry {
    /// Placement title.
    pub display_name: String,
    /// Placement identifier.
    pub usage_id: String,
    /// v1.1 XML grade endpoint.
    pub lti_1_1_result_service_xml_endpoint: String,
    /// v2.0 JSON endpoint template.
    pub lti_2_0_result_service_json_endpoint: String,
}

/// Endpoint discovery handler.
pub(crate) async fn handle_endpoints(
    State(state): State<Arc<ServerState>>,
    Path(course_id): Path<String>,
) -> Response {
    let audit = AuditScope::new(LtiEndpoint::Endpoints, &course_id, None, "GET", 0);
    if !state.config.has_course(&course_id) {
        return audit.finish(&state, not_found("unknown course"));
    }
    let base_url = state.config.server.base_url();
    let entries: Vec<LtiEndpointEntry> = state
        .config
        .course_components(&course_id)
        .into_iter()
        .filter(|component| component.config.has_score)
        .map(|component| LtiEndpointEntry {
            display_name: component.display_name.clone(),
            usage_id: component.usage_id.as_str().to_string(),
            lti_1_1_result_service_xml_endpoint: grade_handler_url(base_url, &component),
            lti_2_0_result_service_json_endpoint: result_service_url(
                base_url,
                &component,
                RESULT_USER_TEMPLATE,
            ),
        })
        .collect();
    audit.finish(&state, json_response(StatusCode::OK, &entries))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the transport-neutral request view.
fn signed_request<'a>(method: &'a str, url: &'a str, headers: &'a HeaderMap, body: &'a [u8]) -> SignedRequest<'a> {
    SignedRequest {
        method,
        url,
        authorization: headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
        content_type: headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()),
        body,
    }
}

/// Returns a header value as a trimmed string.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim)
}

/// Emits the Authorization header a correctly configured tool would send.
///
/// The tool's own nonce and timestamp are reused when present so the hint is
/// directly comparable with the received header.
fn record_authorization_hint(state: &ServerState, component: &ToolComponent, request: &SignedRequest<'_>) {
    let stamp = request
        .authorization
        .and_then(|header| parse_authorization_header(header).ok())
        .and_then(|params| {
            let find = |name: &str| params.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone());
            Some(OAuthStamp::new(find("oauth_nonce")?, find("oauth_timestamp")?))
        })
        .unwrap_or_else(OAuthStamp::generate);
    if let Ok(hint) = state.service.authorization_hint(component, request, &stamp) {
        state.audit.record_hint(&AuthorizationHintEvent::new(
            component.course_id.as_str().to_string(),
            component.usage_id.as_str().to_string(),
            hint.body_hash,
            hint.authorization,
        ));
    }
}

/// Serializes a JSON response.
fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    (status, Json(value)).into_response()
}

/// Builds a 404 response with a JSON error body.
fn not_found(message: &str) -> Response {
    json_response(StatusCode::NOT_FOUND, &json!({ "error": message }))
}

/// Accumulates audit fields while a request is handled.
struct AuditScope {
    /// Endpoint.
    endpoint: LtiEndpoint,
    /// Course id.
    course_id: String,
    /// Usage id.
    usage_id: Option<String>,
    /// HTTP method.
    method: String,
    /// Request body size.
    request_bytes: usize,
    /// Outcome so far.
    outcome: LtiOutcome,
    /// Error kind label.
    error_kind: Option<&'static str>,
    /// Withheld failure detail.
    reason: Option<String>,
}

impl AuditScope {
    /// Starts a scope that records success unless told otherwise.
    fn new(
        endpoint: LtiEndpoint,
        course_id: &str,
        usage_id: Option<&str>,
        method: &str,
        request_bytes: usize,
    ) -> Self {
        Self {
            endpoint,
            course_id: course_id.to_string(),
            usage_id: usage_id.map(ToString::to_string),
            method: method.to_string(),
            request_bytes,
            outcome: LtiOutcome::Success,
            error_kind: None,
            reason: None,
        }
    }

    /// Marks the request rejected.
    fn reject(&mut self, kind: &'static str, reason: String) {
        self.outcome = LtiOutcome::Rejected;
        self.error_kind = Some(kind);
        self.reason = Some(reason);
    }

    /// Marks the request as an unsupported action.
    fn unsupported(&mut self, reason: String) {
        self.outcome = LtiOutcome::Unsupported;
        self.reason = Some(reason);
    }

    /// Records the event for `response` and returns it.
    fn finish(self, state: &ServerState, response: Response) -> Response {
        let status = response.status().as_u16();
        let (outcome, error_kind) = if status == StatusCode::NOT_FOUND.as_u16() && self.error_kind.is_none() {
            (LtiOutcome::Rejected, Some("not_found"))
        } else {
            (self.outcome, self.error_kind)
        };
        let response_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        state.audit.record(&LtiAuditEvent::new(LtiAuditEventParams {
            endpoint: self.endpoint,
            course_id: self.course_id,
            usage_id: self.usage_id,
            method: self.method,
            outcome,
            status,
            error_kind,
            reason: self.reason,
            request_bytes: self.request_bytes,
            response_bytes,
        }));
        response
    }
}
