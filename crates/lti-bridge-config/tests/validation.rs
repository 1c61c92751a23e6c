// crates/lti-bridge-config/tests/validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Field, cross-reference, and limit validation.
// Purpose: Ensure malformed configuration fails closed with a clear message.
// =============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions."
)]

use lti_bridge_config::ConfigError;
use lti_bridge_config::CourseConfig;
use lti_bridge_config::MAX_BODY_BYTES_LIMIT;
use lti_bridge_config::UserConfig;

mod common;

type TestResult = Result<(), String>;

/// Assert that a validation result is an error containing a specific substring.
fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn baseline_config_is_valid() {
    let config = common::valid_config().unwrap();
    config.validate().unwrap();
    assert_eq!(config.server.base_url(), "https://lms.example");
    assert_eq!(config.server.effective_hostname(), "lms.example");
    assert_eq!(config.server.max_body_bytes, 1024 * 1024);
    assert!(config.audit.enabled);
    assert!(!config.server.debug_authorization_hint);
}

#[test]
fn tool_defaults_apply() -> TestResult {
    let config = common::config_from_toml(
        r#"
[server]
bind = "127.0.0.1:8088"
public_base_url = "http://localhost:8088"

[[courses]]
id = "c1"

[[tools]]
usage_id = "t1"
course_id = "c1"
lti_id = "toolA"
"#,
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let component = config.tool_component("c1", "t1").ok_or("tool missing")?;
    assert_eq!(component.display_name, "LTI");
    assert_eq!(component.config.launch_url, "http://www.example.com");
    assert!(component.config.open_in_new_page);
    assert!(!component.config.has_score);
    assert_eq!(component.config.weight, 1.0);
    assert!(!component.config.hide_launch);
    Ok(())
}

#[test]
fn explicit_hostname_overrides_base_url_host() {
    let mut config = common::valid_config().unwrap();
    config.server.hostname = Some("edx.org".to_string());
    assert_eq!(config.server.effective_hostname(), "edx.org");
}

#[test]
fn rejects_invalid_bind() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.server.bind = "not-an-address".to_string();
    assert_invalid(config.validate(), "invalid bind address")
}

#[test]
fn rejects_body_limit_out_of_range() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "greater than zero")?;
    config.server.max_body_bytes = MAX_BODY_BYTES_LIMIT + 1;
    assert_invalid(config.validate(), "exceeds limit")
}

#[test]
fn rejects_non_http_base_url() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.server.public_base_url = "ftp://lms.example".to_string();
    assert_invalid(config.validate(), "http or https")?;
    config.server.public_base_url = "lms.example".to_string();
    assert_invalid(config.validate(), "public_base_url")
}

#[test]
fn rejects_malformed_passport() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.courses[0].lti_passports.push("toolB:keyB".to_string());
    assert_invalid(config.validate(), "course org/course/run")
}

#[test]
fn rejects_malformed_custom_parameter() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.tools[0].custom_parameters.push("broken".to_string());
    assert_invalid(config.validate(), "Could not parse custom parameter")
}

#[test]
fn rejects_negative_or_non_finite_weight() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.tools[0].weight = -1.0;
    assert_invalid(config.validate(), "non-negative")?;
    config.tools[0].weight = f64::NAN;
    assert_invalid(config.validate(), "non-negative")
}

#[test]
fn rejects_tool_with_unknown_course() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.tools[0].course_id = "missing".to_string();
    assert_invalid(config.validate(), "unknown course")
}

#[test]
fn rejects_duplicate_identifiers() -> TestResult {
    let mut config = common::valid_config().unwrap();
    let tool = config.tools[0].clone();
    config.tools.push(tool);
    assert_invalid(config.validate(), "duplicate tool usage_id")?;

    let mut config = common::valid_config().unwrap();
    config.courses.push(CourseConfig {
        id: "org/course/run".to_string(),
        lti_passports: Vec::new(),
    });
    assert_invalid(config.validate(), "duplicate course id")?;

    let mut config = common::valid_config().unwrap();
    config.users.push(UserConfig {
        anonymous_id: "anon_student".to_string(),
        user_id: "someone-else".to_string(),
    });
    assert_invalid(config.validate(), "duplicate anonymous_id")
}

#[test]
fn rejects_empty_audit_path() -> TestResult {
    let mut config = common::valid_config().unwrap();
    config.audit.path = Some("   ".to_string());
    assert_invalid(config.validate(), "audit.path must be non-empty")
}

#[test]
fn missing_server_section_is_parse_error() {
    assert!(common::config_from_toml("[[courses]]\nid = \"c1\"\n").is_err());
}
