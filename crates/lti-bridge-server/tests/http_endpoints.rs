// crates/lti-bridge-server/tests/http_endpoints.rs
// ============================================================================
// Module: HTTP Endpoint Tests
// Description: End-to-end LTI exchanges over a real socket.
// Purpose: Validate routing, path decoding, and signature URL reconstruction.
// Dependencies: lti-bridge-server, reqwest, tokio
// ============================================================================

//! ## Overview
//! Drives the server the way a tool provider would: launch, post a v1.1
//! grade, then read and clear it through the v2.0 result service.

mod common;

use common::TestResult;
use common::authorization;
use common::spawn_server;
use lti_bridge_core::RESULT_CONTENT_TYPE;
use reqwest::Method;
use reqwest::StatusCode;
use serde_json::Value;

const REPLACE_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
  <imsx_POXHeader><imsx_POXRequestHeaderInfo>
    <imsx_version>V1.0</imsx_version>
    <imsx_messageIdentifier>999</imsx_messageIdentifier>
  </imsx_POXRequestHeaderInfo></imsx_POXHeader>
  <imsx_POXBody><replaceResultRequest><resultRecord>
    <sourcedGUID><sourcedId>org/course/run:lms.example-quiz:anon_student</sourcedId></sourcedGUID>
    <result><resultScore><language>en</language><textString>0.25</textString></resultScore></result>
  </resultRecord></replaceResultRequest></imsx_POXBody>
</imsx_POXEnvelopeRequest>"#;

async fn signed(
    server: &common::TestServer,
    method: Method,
    url: &str,
    content_type: &str,
    body: &str,
) -> Result<reqwest::Response, String> {
    let header = authorization(method.as_str(), url, body.as_bytes())?;
    server
        .client
        .request(method, url)
        .header("Authorization", header)
        .header("Content-Type", content_type)
        .body(body.to_string())
        .send()
        .await
        .map_err(|err| format!("request failed: {err}"))
}

#[tokio::test]
async fn launch_then_grade_round_trip() -> TestResult {
    let server = spawn_server().await?;

    let launch = server
        .client
        .get(server.tool_url("quiz", "launch"))
        .header("x-lti-anonymous-user", "anon_student")
        .send()
        .await
        .map_err(|err| format!("launch failed: {err}"))?;
    if launch.status() != StatusCode::OK {
        return Err(format!("launch status {}", launch.status()));
    }
    let text = launch.text().await.map_err(|err| err.to_string())?;
    let view: Value = serde_json::from_str(&text).map_err(|err| err.to_string())?;
    let outcome_url = view["input_fields"]["lis_outcome_service_url"]
        .as_str()
        .ok_or("missing outcome url")?
        .to_string();
    if outcome_url != server.tool_url("quiz", "grade_handler") {
        return Err(format!("unexpected outcome url {outcome_url}"));
    }

    let response = signed(&server, Method::POST, &outcome_url, "application/xml", REPLACE_REQUEST).await?;
    if response.status() != StatusCode::OK {
        return Err(format!("passback status {}", response.status()));
    }
    let envelope = response.text().await.map_err(|err| err.to_string())?;
    if !envelope.contains("<imsx_codeMajor>success</imsx_codeMajor>") {
        return Err(format!("passback failed: {envelope}"));
    }
    let events = server.ledger.events();
    if events.len() != 1 || events[0].value != Some(1.0) {
        return Err("ledger did not receive the weighted score".to_string());
    }

    let result_url = server.tool_url("quiz", "lti_2_0_result_rest_handler/user/anon_student");
    let response = signed(&server, Method::GET, &result_url, RESULT_CONTENT_TYPE, "").await?;
    if response.status() != StatusCode::OK {
        return Err(format!("result GET status {}", response.status()));
    }
    let document: Value =
        serde_json::from_str(&response.text().await.map_err(|err| err.to_string())?)
            .map_err(|err| err.to_string())?;
    if document["resultScore"] != 1.0 {
        return Err(format!("unexpected result document {document}"));
    }

    let response = signed(&server, Method::DELETE, &result_url, RESULT_CONTENT_TYPE, "").await?;
    if response.status() != StatusCode::OK {
        return Err(format!("result DELETE status {}", response.status()));
    }
    let events = server.ledger.events();
    if events.last().map(|event| event.value) != Some(None) {
        return Err("delete did not clear the ledger".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn unsigned_result_request_is_unauthorized() -> TestResult {
    let server = spawn_server().await?;
    let response = server
        .client
        .get(server.tool_url("quiz", "lti_2_0_result_rest_handler/user/anon_student"))
        .header("Content-Type", RESULT_CONTENT_TYPE)
        .send()
        .await
        .map_err(|err| format!("request failed: {err}"))?;
    if response.status() != StatusCode::UNAUTHORIZED {
        return Err(format!("expected 401, got {}", response.status()));
    }
    Ok(())
}

#[tokio::test]
async fn endpoint_discovery_lists_handler_urls() -> TestResult {
    let server = spawn_server().await?;
    let response = server
        .client
        .get(format!("{}/courses/{}/lti_endpoints", server.base_url, common::COURSE_SEGMENT))
        .send()
        .await
        .map_err(|err| format!("request failed: {err}"))?;
    if response.status() != StatusCode::OK {
        return Err(format!("discovery status {}", response.status()));
    }
    let entries: Value = serde_json::from_str(&response.text().await.map_err(|err| err.to_string())?)
        .map_err(|err| err.to_string())?;
    let expected = server.tool_url("quiz", "lti_2_0_result_rest_handler/user/{anon_user_id}");
    if entries[0]["lti_2_0_result_service_json_endpoint"] != expected.as_str() {
        return Err(format!("unexpected discovery payload {entries}"));
    }
    Ok(())
}
