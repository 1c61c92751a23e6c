// crates/lti-bridge-server/src/server/tests.rs
// ============================================================================
// Module: LTI Server Unit Tests
// Description: Direct handler tests over in-memory collaborators.
// Purpose: Validate routing glue, URL reconstruction, and audit records.
// Dependencies: lti-bridge-server
// ============================================================================

//! ## Overview
//! Invokes axum handlers directly with extractor values, the way a request
//! would reach them after routing.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only handler assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use axum::body::Bytes;
use axum::body::to_bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use lti_bridge_config::AuditConfig;
use lti_bridge_config::CourseConfig;
use lti_bridge_config::LtiBridgeConfig;
use lti_bridge_config::ServerConfig;
use lti_bridge_config::ToolPlacementConfig;
use lti_bridge_config::UserConfig;
use lti_bridge_core::ClientCredentials;
use lti_bridge_core::InMemoryGradeLedger;
use lti_bridge_core::InMemoryGradeStateStore;
use lti_bridge_core::LtiService;
use lti_bridge_core::OAuthClient;
use lti_bridge_core::OAuthStamp;
use lti_bridge_core::RESULT_CONTENT_TYPE;
use serde_json::Value;

use super::ANONYMOUS_USER_HEADER;
use super::ServerState;
use super::USER_ROLE_HEADER;
use super::grade_handler_url;
use super::handle_endpoints;
use super::handle_grade_passback;
use super::handle_launch;
use super::handle_result_service;
use super::handle_result_service_root;
use super::request_url;
use crate::audit::AuthorizationHintEvent;
use crate::audit::LtiAuditEvent;
use crate::audit::LtiAuditSink;
use crate::audit::LtiEndpoint;
use crate::audit::LtiOutcome;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const COURSE: &str = "org/course/run";
const BASE_URL: &str = "https://lms.example";
const GRADE_PATH: &str = "/courses/org%2Fcourse%2Frun/tools/quiz/grade_handler";
const RESULT_PATH: &str =
    "/courses/org%2Fcourse%2Frun/tools/quiz/lti_2_0_result_rest_handler/user/anon_student";

#[derive(Default)]
struct TestAudit {
    events: Mutex<Vec<LtiAuditEvent>>,
    hints: Mutex<Vec<AuthorizationHintEvent>>,
}

impl LtiAuditSink for TestAudit {
    fn record(&self, event: &LtiAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }

    fn record_hint(&self, event: &AuthorizationHintEvent) {
        self.hints.lock().expect("hint lock").push(event.clone());
    }
}

impl TestAudit {
    fn last(&self) -> LtiAuditEvent {
        self.events.lock().expect("audit lock").last().cloned().expect("audit event")
    }
}

fn tool(usage_id: &str, has_score: bool) -> ToolPlacementConfig {
    ToolPlacementConfig {
        usage_id: usage_id.to_string(),
        course_id: COURSE.to_string(),
        display_name: format!("Tool {usage_id}"),
        lti_id: "toolA".to_string(),
        launch_url: "https://tool.example/launch".to_string(),
        custom_parameters: vec!["color=blue".to_string()],
        open_in_new_page: true,
        has_score,
        weight: 10.0,
        hide_launch: false,
    }
}

fn sample_config() -> LtiBridgeConfig {
    LtiBridgeConfig {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            public_base_url: format!("{BASE_URL}/"),
            hostname: None,
            max_body_bytes: 64 * 1024,
            debug_authorization_hint: false,
        },
        audit: AuditConfig::default(),
        courses: vec![CourseConfig {
            id: COURSE.to_string(),
            lti_passports: vec!["toolA:keyA:secretA".to_string()],
        }],
        tools: vec![tool("quiz", true), tool("reading", false)],
        users: vec![UserConfig {
            anonymous_id: "anon_student".to_string(),
            user_id: "user-42".to_string(),
        }],
    }
}

struct Harness {
    state: Arc<ServerState>,
    ledger: InMemoryGradeLedger,
    audit: Arc<TestAudit>,
}

fn harness(config: LtiBridgeConfig) -> Harness {
    let ledger = InMemoryGradeLedger::new();
    let audit = Arc::new(TestAudit::default());
    let service = LtiService::new(
        Arc::new(config.credential_source()),
        Arc::new(config.user_directory()),
        Arc::new(ledger.clone()),
        Arc::new(InMemoryGradeStateStore::new()),
    );
    let state = Arc::new(ServerState {
        config,
        service,
        audit: audit.clone(),
    });
    Harness {
        state,
        ledger,
        audit,
    }
}

fn signed_headers(method: &str, path: &str, body: &[u8], content_type: &str) -> HeaderMap {
    let authorization = OAuthClient::new(ClientCredentials::new("keyA", "secretA"))
        .sign_body(method, &format!("{BASE_URL}{path}"), body, &OAuthStamp::new("nonce-9", "1700000000"))
        .expect("sign body");
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization).expect("header"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).expect("content type"));
    headers
}

fn replace_request(score: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
  <imsx_POXHeader><imsx_POXRequestHeaderInfo>
    <imsx_version>V1.0</imsx_version>
    <imsx_messageIdentifier>msg-1</imsx_messageIdentifier>
  </imsx_POXRequestHeaderInfo></imsx_POXHeader>
  <imsx_POXBody><replaceResultRequest><resultRecord>
    <sourcedGUID><sourcedId>course:lms.example-quiz:anon_student</sourcedId></sourcedGUID>
    <result><resultScore><language>en</language><textString>{score}</textString></resultScore></result>
  </resultRecord></replaceResultRequest></imsx_POXBody>
</imsx_POXEnvelopeRequest>"#
    )
}

fn placement() -> Path<(String, String)> {
    Path((COURSE.to_string(), "quiz".to_string()))
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

async fn post_grade(harness: &Harness, body: &str) -> Response {
    let headers = signed_headers("POST", GRADE_PATH, body.as_bytes(), "application/xml");
    handle_grade_passback(
        State(Arc::clone(&harness.state)),
        placement(),
        Uri::from_static(GRADE_PATH),
        headers,
        Bytes::from(body.to_string()),
    )
    .await
}

// ============================================================================
// SECTION: URLs
// ============================================================================

#[test]
fn handler_urls_escape_path_segments() {
    let config = sample_config();
    let component = config.tool_component(COURSE, "quiz").expect("component");
    assert_eq!(
        grade_handler_url(config.server.base_url(), &component),
        format!("{BASE_URL}{GRADE_PATH}")
    );
}

#[test]
fn request_url_keeps_query() {
    let uri = Uri::from_static("/courses/c/tools/t/grade_handler?a=1&b=2");
    assert_eq!(request_url(BASE_URL, &uri), "https://lms.example/courses/c/tools/t/grade_handler?a=1&b=2");
}

// ============================================================================
// SECTION: Launch
// ============================================================================

#[tokio::test]
async fn launch_returns_signed_form() {
    let harness = harness(sample_config());
    let mut headers = HeaderMap::new();
    headers.insert(ANONYMOUS_USER_HEADER, HeaderValue::from_static("anon_student"));
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("instructor"));

    let response = handle_launch(State(Arc::clone(&harness.state)), placement(), headers).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    let fields = &view["input_fields"];
    assert_eq!(fields["roles"], "Instructor");
    assert_eq!(fields["oauth_consumer_key"], "keyA");
    assert_eq!(fields["custom_color"], "blue");
    assert_eq!(fields["lis_outcome_service_url"], format!("{BASE_URL}{GRADE_PATH}"));
    assert_eq!(view["signature"]["kind"], "signed");
    assert_eq!(view["launch_url"], "https://tool.example/launch");

    let event = harness.audit.last();
    assert_eq!(event.endpoint, LtiEndpoint::Launch);
    assert_eq!(event.outcome, LtiOutcome::Success);
    assert_eq!(event.status, 200);
}

#[tokio::test]
async fn launch_requires_anonymous_user_header() {
    let harness = harness(sample_config());
    let response =
        handle_launch(State(Arc::clone(&harness.state)), placement(), HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let event = harness.audit.last();
    assert_eq!(event.outcome, LtiOutcome::Rejected);
    assert_eq!(event.error_kind, Some("missing_user"));
}

#[tokio::test]
async fn launch_unknown_placement_is_not_found() {
    let harness = harness(sample_config());
    let mut headers = HeaderMap::new();
    headers.insert(ANONYMOUS_USER_HEADER, HeaderValue::from_static("anon_student"));
    let response = handle_launch(
        State(Arc::clone(&harness.state)),
        Path((COURSE.to_string(), "missing".to_string())),
        headers,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.audit.last().error_kind, Some("not_found"));
}

// ============================================================================
// SECTION: Grade Passback
// ============================================================================

#[tokio::test]
async fn grade_passback_publishes_weighted_score() {
    let harness = harness(sample_config());
    let response = post_grade(&harness, &replace_request("0.8")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).expect("content type"), "application/xml");
    let envelope = body_text(response).await;
    assert!(envelope.contains("<imsx_codeMajor>success</imsx_codeMajor>"));

    let events = harness.ledger.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value, Some(8.0));
    assert_eq!(events[0].max_value, Some(10.0));
    assert_eq!(harness.audit.last().outcome, LtiOutcome::Success);
}

#[tokio::test]
async fn grade_passback_rejection_keeps_http_ok() {
    let harness = harness(sample_config());
    let response = post_grade(&harness, &replace_request("1.5")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_text(response).await;
    assert!(envelope.contains("<imsx_codeMajor>failure</imsx_codeMajor>"));
    assert!(harness.ledger.events().is_empty());

    let event = harness.audit.last();
    assert_eq!(event.outcome, LtiOutcome::Rejected);
    assert_eq!(event.error_kind, Some("protocol_parse"));
}

#[tokio::test]
async fn grade_passback_oversized_body_returns_parse_failure_envelope() {
    let mut config = sample_config();
    config.server.max_body_bytes = 16;
    let harness = harness(config);
    let response = post_grade(&harness, &replace_request("0.5")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_text(response).await;
    assert!(envelope.contains("Request body XML parsing error"));
    assert!(envelope.contains("<imsx_messageIdentifier>unknown</imsx_messageIdentifier>"));
    assert!(harness.ledger.events().is_empty());
}

// ============================================================================
// SECTION: Result Service
// ============================================================================

#[tokio::test]
async fn result_service_get_reads_passback_score() {
    let mut config = sample_config();
    config.server.debug_authorization_hint = true;
    let harness = harness(config);
    post_grade(&harness, &replace_request("0.8")).await;

    let headers = signed_headers("GET", RESULT_PATH, b"", RESULT_CONTENT_TYPE);
    let response = handle_result_service(
        State(Arc::clone(&harness.state)),
        Path((COURSE.to_string(), "quiz".to_string(), "user/anon_student".to_string())),
        Method::GET,
        Uri::from_static(RESULT_PATH),
        headers.clone(),
        Bytes::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).expect("content type"), RESULT_CONTENT_TYPE);
    let document = body_json(response).await;
    assert_eq!(document["@type"], "Result");
    assert_eq!(document["resultScore"], 8.0);

    let hints = harness.audit.hints.lock().expect("hint lock");
    assert_eq!(hints.len(), 1);
    let sent = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).expect("auth");
    assert_eq!(hints[0].authorization, sent);
}

#[tokio::test]
async fn result_service_tampered_signature_is_unauthorized() {
    let harness = harness(sample_config());
    let body = br#"{"@context": "http://purl.imsglobal.org/ctx/lis/v2/Result", "@type": "Result", "resultScore": 0.1}"#;
    let headers = signed_headers("PUT", RESULT_PATH, b"{}", RESULT_CONTENT_TYPE);
    let response = handle_result_service(
        State(Arc::clone(&harness.state)),
        Path((COURSE.to_string(), "quiz".to_string(), "user/anon_student".to_string())),
        Method::PUT,
        Uri::from_static(RESULT_PATH),
        headers,
        Bytes::from_static(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.is_empty());
    assert!(harness.ledger.events().is_empty());
    assert_eq!(harness.audit.last().error_kind, Some("authentication"));
}

#[tokio::test]
async fn result_service_without_suffix_is_not_found() {
    let harness = harness(sample_config());
    let path = "/courses/org%2Fcourse%2Frun/tools/quiz/lti_2_0_result_rest_handler";
    let headers = signed_headers("GET", path, b"", RESULT_CONTENT_TYPE);
    let response = handle_result_service_root(
        State(Arc::clone(&harness.state)),
        placement(),
        Method::GET,
        Uri::from_static(path),
        headers,
        Bytes::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.audit.last().endpoint, LtiEndpoint::ResultService);
}

// ============================================================================
// SECTION: Endpoint Discovery
// ============================================================================

#[tokio::test]
async fn endpoints_list_only_scored_placements() {
    let harness = harness(sample_config());
    let response = handle_endpoints(State(Arc::clone(&harness.state)), Path(COURSE.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["usage_id"], "quiz");
    assert_eq!(entries[0]["lti_1_1_result_service_xml_endpoint"], format!("{BASE_URL}{GRADE_PATH}"));
    assert_eq!(
        entries[0]["lti_2_0_result_service_json_endpoint"],
        format!(
            "{BASE_URL}/courses/org%2Fcourse%2Frun/tools/quiz/lti_2_0_result_rest_handler/user/{{anon_user_id}}"
        )
    );
}

#[tokio::test]
async fn endpoints_unknown_course_is_not_found() {
    let harness = harness(sample_config());
    let response =
        handle_endpoints(State(Arc::clone(&harness.state)), Path("other".to_string())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.audit.last().endpoint, LtiEndpoint::Endpoints);
}
