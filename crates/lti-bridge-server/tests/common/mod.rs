// crates/lti-bridge-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Harness
// Description: Spawns the LTI server on an ephemeral port.
// ============================================================================
//! ## Overview
//! Binds a loopback listener first so the public base URL the server
//! verifies signatures against matches the address tools call.

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures.")]

use std::sync::Arc;

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
use lti_bridge_server::LtiServer;
use lti_bridge_server::NoopAuditSink;

pub type TestResult = Result<(), String>;

pub const COURSE_SEGMENT: &str = "org%2Fcourse%2Frun";

/// Running server handle.
pub struct TestServer {
    pub base_url: String,
    pub ledger: InMemoryGradeLedger,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute URL of a placement handler.
    pub fn tool_url(&self, usage_id: &str, handler: &str) -> String {
        format!("{}/courses/{COURSE_SEGMENT}/tools/{usage_id}/{handler}", self.base_url)
    }
}

/// Configuration pointing at `base_url`.
pub fn config(base_url: &str) -> LtiBridgeConfig {
    LtiBridgeConfig {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            public_base_url: base_url.to_string(),
            hostname: Some("lms.example".to_string()),
            max_body_bytes: 64 * 1024,
            debug_authorization_hint: false,
        },
        audit: AuditConfig {
            enabled: false,
            path: None,
        },
        courses: vec![CourseConfig {
            id: "org/course/run".to_string(),
            lti_passports: vec!["toolA:keyA:secretA".to_string()],
        }],
        tools: vec![ToolPlacementConfig {
            usage_id: "quiz".to_string(),
            course_id: "org/course/run".to_string(),
            display_name: "Quiz".to_string(),
            lti_id: "toolA".to_string(),
            launch_url: "https://tool.example/launch".to_string(),
            custom_parameters: Vec::new(),
            open_in_new_page: true,
            has_score: true,
            weight: 4.0,
            hide_launch: false,
        }],
        users: vec![UserConfig {
            anonymous_id: "anon_student".to_string(),
            user_id: "user-42".to_string(),
        }],
    }
}

/// Spawns a server on an ephemeral loopback port.
pub async fn spawn_server() -> Result<TestServer, String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("bind failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("local addr failed: {err}"))?;
    let base_url = format!("http://{addr}");
    let config = config(&base_url);
    let ledger = InMemoryGradeLedger::new();
    let service = LtiService::new(
        Arc::new(config.credential_source()),
        Arc::new(config.user_directory()),
        Arc::new(ledger.clone()),
        Arc::new(InMemoryGradeStateStore::new()),
    );
    let server = LtiServer::with_service(config, service, Arc::new(NoopAuditSink))
        .map_err(|err| format!("server build failed: {err}"))?;
    tokio::spawn(async move {
        let _ = server.serve_listener(listener).await;
    });
    Ok(TestServer {
        base_url,
        ledger,
        client: reqwest::Client::new(),
    })
}

/// Signs a request body with the configured passport.
pub fn authorization(method: &str, url: &str, body: &[u8]) -> Result<String, String> {
    OAuthClient::new(ClientCredentials::new("keyA", "secretA"))
        .sign_body(method, url, body, &OAuthStamp::generate())
        .map_err(|err| format!("sign failed: {err}"))
}
