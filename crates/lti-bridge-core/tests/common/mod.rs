// crates/lti-bridge-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared placement, collaborator, and request-signing helpers.
// ============================================================================
//! ## Overview
//! Builds an [`LtiService`] over in-memory collaborators and signs tool
//! callbacks the way a conforming tool provider would.

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures.")]
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only fixtures.")]

use std::sync::Arc;

use lti_bridge_core::AnonymousUserId;
use lti_bridge_core::ClientCredentials;
use lti_bridge_core::CourseId;
use lti_bridge_core::GradeEvent;
use lti_bridge_core::GradeLedger;
use lti_bridge_core::GradeState;
use lti_bridge_core::InMemoryGradeLedger;
use lti_bridge_core::InMemoryGradeStateStore;
use lti_bridge_core::InMemoryUserDirectory;
use lti_bridge_core::LedgerError;
use lti_bridge_core::LtiService;
use lti_bridge_core::OAuthClient;
use lti_bridge_core::OAuthStamp;
use lti_bridge_core::RealUser;
use lti_bridge_core::StaticCredentialSource;
use lti_bridge_core::ToolComponent;
use lti_bridge_core::ToolConfiguration;
use lti_bridge_core::ToolId;
use lti_bridge_core::UsageId;

// ============================================================================
// SECTION: Constants
// ============================================================================

pub const COURSE: &str = "org/course/run";
pub const TOOL: &str = "toolA";
pub const KEY: &str = "keyA";
pub const SECRET: &str = "secretA";
pub const ANON: &str = "anon_student";
pub const USER: &str = "user-42";
pub const GRADE_URL: &str = "https://lms.example/courses/org%2Fcourse%2Frun/tools/quiz/grade_handler";
pub const RESULT_URL: &str =
    "https://lms.example/courses/org%2Fcourse%2Frun/tools/quiz/lti_2_0_result_rest_handler/user/anon_student";

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Ledger that rejects every publish.
pub struct FailingLedger;

impl GradeLedger for FailingLedger {
    fn publish_grade(&self, _event: &GradeEvent) -> Result<(), LedgerError> {
        Err(LedgerError::Publish("ledger offline".to_string()))
    }
}

/// Service plus handles on its in-memory state.
pub struct Fixture {
    pub service: LtiService,
    pub ledger: InMemoryGradeLedger,
    pub store: InMemoryGradeStateStore,
    pub component: ToolComponent,
}

impl Fixture {
    /// Scored placement with weight 10.
    pub fn scored() -> Self {
        Self::build(component(true, 10.0), &[&format!("{TOOL}:{KEY}:{SECRET}")])
    }

    /// Placement with the given passports.
    pub fn build(component: ToolComponent, passports: &[&str]) -> Self {
        let ledger = InMemoryGradeLedger::new();
        let store = InMemoryGradeStateStore::new();
        let service = LtiService::new(
            Arc::new(StaticCredentialSource::new().with_course(
                CourseId::new(COURSE),
                passports.iter().map(ToString::to_string).collect(),
            )),
            Arc::new(users()),
            Arc::new(ledger.clone()),
            Arc::new(store.clone()),
        );
        Self {
            service,
            ledger,
            store,
            component,
        }
    }

    /// Scored placement whose ledger always fails.
    pub fn failing_ledger() -> Self {
        let store = InMemoryGradeStateStore::new();
        let service = LtiService::new(
            Arc::new(StaticCredentialSource::new().with_course(
                CourseId::new(COURSE),
                vec![format!("{TOOL}:{KEY}:{SECRET}")],
            )),
            Arc::new(users()),
            Arc::new(FailingLedger),
            Arc::new(store.clone()),
        );
        Self {
            service,
            ledger: InMemoryGradeLedger::new(),
            store,
            component: component(true, 10.0),
        }
    }

    /// Cached grade state of the fixture user.
    pub fn state(&self) -> GradeState {
        self.service.grade_state(&self.component, &RealUser::new(USER)).unwrap()
    }
}

/// Placement fixture.
pub fn component(has_score: bool, weight: f64) -> ToolComponent {
    ToolComponent {
        course_id: CourseId::new(COURSE),
        usage_id: UsageId::new("quiz"),
        display_name: "Quiz".to_string(),
        config: ToolConfiguration {
            tool_id: ToolId::new(TOOL),
            launch_url: "https://tool.example/launch".to_string(),
            has_score,
            weight,
            ..ToolConfiguration::default()
        },
    }
}

/// Directory with a single known user.
pub fn users() -> InMemoryUserDirectory {
    InMemoryUserDirectory::new().with_user(AnonymousUserId::new(ANON), RealUser::new(USER))
}

// ============================================================================
// SECTION: Request Signing
// ============================================================================

/// Signs a body the way a tool provider with the fixture secret would.
pub fn authorization(method: &str, url: &str, body: &[u8]) -> String {
    authorization_with(SECRET, method, url, body)
}

/// Signs a body with an arbitrary secret.
pub fn authorization_with(secret: &str, method: &str, url: &str, body: &[u8]) -> String {
    OAuthClient::new(ClientCredentials::new(KEY, secret))
        .sign_body(method, url, body, &OAuthStamp::new("nonce-1", "1700000000"))
        .unwrap()
}

/// POX replace/other request for the fixture user.
pub fn pox_request(action: &str, score: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
  <imsx_POXHeader>
    <imsx_POXRequestHeaderInfo>
      <imsx_version>V1.0</imsx_version>
      <imsx_messageIdentifier>msg-7</imsx_messageIdentifier>
    </imsx_POXRequestHeaderInfo>
  </imsx_POXHeader>
  <imsx_POXBody>
    <{action}>
      <resultRecord>
        <sourcedGUID><sourcedId>org/course/run:lms.example-quiz:{ANON}</sourcedId></sourcedGUID>
        <result><resultScore><language>en-us</language><textString>{score}</textString></resultScore></result>
      </resultRecord>
    </{action}>
  </imsx_POXBody>
</imsx_POXEnvelopeRequest>"#
    )
}
