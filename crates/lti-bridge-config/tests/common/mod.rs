// crates/lti-bridge-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for lti-bridge-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use lti_bridge_config::LtiBridgeConfig;

/// Minimal valid configuration with one scored tool and one user.
pub const VALID_TOML: &str = r#"
[server]
bind = "127.0.0.1:8088"
public_base_url = "https://lms.example/"

[[courses]]
id = "org/course/run"
lti_passports = ["toolA:keyA:secretA"]

[[tools]]
usage_id = "quiz"
course_id = "org/course/run"
lti_id = "toolA"
launch_url = "https://tool.example/launch"
custom_parameters = ["color=blue"]
has_score = true
weight = 10.0

[[users]]
anonymous_id = "anon_student"
user_id = "user-42"
"#;

/// Parses a TOML string into an `LtiBridgeConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<LtiBridgeConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns the valid baseline configuration.
pub fn valid_config() -> Result<LtiBridgeConfig, toml::de::Error> {
    config_from_toml(VALID_TOML)
}
