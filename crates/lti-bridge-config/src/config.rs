// crates/lti-bridge-config/src/config.rs
// ============================================================================
// Module: LTI Bridge Configuration
// Description: Configuration loading and validation for the LTI bridge.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: lti-bridge-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Course passports and custom launch parameters are validated eagerly so a
//! malformed entry is reported at startup rather than on the first launch.
//! Config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use lti_bridge_core::AnonymousUserId;
use lti_bridge_core::CourseId;
use lti_bridge_core::CredentialEntry;
use lti_bridge_core::InMemoryUserDirectory;
use lti_bridge_core::RealUser;
use lti_bridge_core::StaticCredentialSource;
use lti_bridge_core::ToolComponent;
use lti_bridge_core::ToolConfiguration;
use lti_bridge_core::ToolId;
use lti_bridge_core::UsageId;
use lti_bridge_core::launch::parse_custom_parameters;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "lti-bridge.toml";
/// Environment variable overriding the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "LTI_BRIDGE_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted request body limit.
pub const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum number of courses.
pub(crate) const MAX_COURSES: usize = 1024;
/// Maximum passports per course.
pub(crate) const MAX_PASSPORTS_PER_COURSE: usize = 256;
/// Maximum number of tool placements.
pub(crate) const MAX_TOOLS: usize = 8192;
/// Maximum custom parameters per tool.
pub(crate) const MAX_CUSTOM_PARAMETERS: usize = 128;
/// Maximum number of directory users.
pub(crate) const MAX_USERS: usize = 65_536;
/// Maximum identifier length (course, usage, tool, user ids).
pub(crate) const MAX_ID_LENGTH: usize = 512;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// LTI bridge service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LtiBridgeConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Courses and their LTI passports.
    #[serde(default)]
    pub courses: Vec<CourseConfig>,
    /// Tool placements.
    #[serde(default)]
    pub tools: Vec<ToolPlacementConfig>,
    /// Anonymous-id user directory.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl LtiBridgeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.audit.validate()?;
        if self.courses.len() > MAX_COURSES {
            return Err(ConfigError::Invalid("too many courses".to_string()));
        }
        if self.tools.len() > MAX_TOOLS {
            return Err(ConfigError::Invalid("too many tools".to_string()));
        }
        if self.users.len() > MAX_USERS {
            return Err(ConfigError::Invalid("too many users".to_string()));
        }

        let mut course_ids = BTreeSet::new();
        for course in &self.courses {
            course.validate()?;
            if !course_ids.insert(course.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate course id: {}", course.id)));
            }
        }

        let mut usage_ids = BTreeSet::new();
        for tool in &self.tools {
            tool.validate()?;
            if !course_ids.contains(tool.course_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "tool {} references unknown course {}",
                    tool.usage_id, tool.course_id
                )));
            }
            if !usage_ids.insert(tool.usage_id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate tool usage_id: {}", tool.usage_id)));
            }
        }

        let mut anonymous_ids = BTreeSet::new();
        for user in &self.users {
            user.validate()?;
            if !anonymous_ids.insert(user.anonymous_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate anonymous_id: {}",
                    user.anonymous_id
                )));
            }
        }
        Ok(())
    }

    /// Returns the placement for `course_id`/`usage_id`, if configured.
    #[must_use]
    pub fn tool_component(&self, course_id: &str, usage_id: &str) -> Option<ToolComponent> {
        self.tools
            .iter()
            .find(|tool| tool.course_id == course_id && tool.usage_id == usage_id)
            .map(ToolPlacementConfig::component)
    }

    /// Returns every placement of `course_id` in declaration order.
    #[must_use]
    pub fn course_components(&self, course_id: &str) -> Vec<ToolComponent> {
        self.tools
            .iter()
            .filter(|tool| tool.course_id == course_id)
            .map(ToolPlacementConfig::component)
            .collect()
    }

    /// Returns whether `course_id` is declared.
    #[must_use]
    pub fn has_course(&self, course_id: &str) -> bool {
        self.courses.iter().any(|course| course.id == course_id)
    }

    /// Builds the course passport source.
    #[must_use]
    pub fn credential_source(&self) -> StaticCredentialSource {
        self.courses.iter().fold(StaticCredentialSource::new(), |source, course| {
            source.with_course(CourseId::new(course.id.clone()), course.lti_passports.clone())
        })
    }

    /// Builds the anonymous-id user directory.
    #[must_use]
    pub fn user_directory(&self) -> InMemoryUserDirectory {
        self.users.iter().fold(InMemoryUserDirectory::new(), |directory, user| {
            directory.with_user(
                AnonymousUserId::new(user.anonymous_id.clone()),
                RealUser::new(user.user_id.clone()),
            )
        })
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
    /// Externally visible base URL of the service.
    pub public_base_url: String,
    /// Platform host name used in `resource_link_id`.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Log the Authorization header a tool should have sent (v2.0 only).
    #[serde(default)]
    pub debug_authorization_hint: bool,
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes exceeds limit".to_string()));
        }
        let url = Url::parse(self.public_base_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("invalid public_base_url: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("public_base_url must be http or https".to_string()));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid("public_base_url must include a host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "public_base_url must not carry a query or fragment".to_string(),
            ));
        }
        if let Some(hostname) = &self.hostname {
            validate_id("server.hostname", hostname)?;
        }
        Ok(())
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim().trim_end_matches('/')
    }

    /// Returns the platform host name (explicit, or the base URL host).
    #[must_use]
    pub fn effective_hostname(&self) -> String {
        if let Some(hostname) = &self.hostname {
            return hostname.trim().to_string();
        }
        Url::parse(self.base_url())
            .ok()
            .and_then(|url| url.host_str().map(ToString::to_string))
            .unwrap_or_default()
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emit audit records.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Append JSON lines to this file instead of stderr.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Course and its LTI passports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Course identifier.
    pub id: String,
    /// Ordered `"id:key:secret"` passports.
    #[serde(default)]
    pub lti_passports: Vec<String>,
}

impl CourseConfig {
    /// Validates the course entry and parses every passport.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_id("courses.id", &self.id)?;
        if self.lti_passports.len() > MAX_PASSPORTS_PER_COURSE {
            return Err(ConfigError::Invalid(format!("course {} has too many passports", self.id)));
        }
        for passport in &self.lti_passports {
            CredentialEntry::parse(passport).map_err(|err| {
                ConfigError::Invalid(format!("course {}: {err}", self.id))
            })?;
        }
        Ok(())
    }
}

/// One tool placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPlacementConfig {
    /// Placement identifier, unique across the service.
    pub usage_id: String,
    /// Owning course.
    pub course_id: String,
    /// Title shown to learners.
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Passport id linking the placement to credentials.
    pub lti_id: String,
    /// Tool launch URL.
    #[serde(default = "default_launch_url")]
    pub launch_url: String,
    /// Raw `key=value` custom parameters.
    #[serde(default)]
    pub custom_parameters: Vec<String>,
    /// Open the tool in a new page.
    #[serde(default = "default_true")]
    pub open_in_new_page: bool,
    /// Whether the tool reports grades.
    #[serde(default)]
    pub has_score: bool,
    /// Points possible.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Hide the launch button.
    #[serde(default)]
    pub hide_launch: bool,
}

impl ToolPlacementConfig {
    /// Validates the placement.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_id("tools.usage_id", &self.usage_id)?;
        validate_id("tools.course_id", &self.course_id)?;
        validate_id("tools.lti_id", &self.lti_id)?;
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tool {} weight must be finite and non-negative",
                self.usage_id
            )));
        }
        if self.custom_parameters.len() > MAX_CUSTOM_PARAMETERS {
            return Err(ConfigError::Invalid(format!(
                "tool {} has too many custom parameters",
                self.usage_id
            )));
        }
        parse_custom_parameters(&self.custom_parameters)
            .map_err(|err| ConfigError::Invalid(format!("tool {}: {err}", self.usage_id)))?;
        Ok(())
    }

    /// Converts the placement into the core model.
    #[must_use]
    pub fn component(&self) -> ToolComponent {
        ToolComponent {
            course_id: CourseId::new(self.course_id.clone()),
            usage_id: UsageId::new(self.usage_id.clone()),
            display_name: self.display_name.clone(),
            config: ToolConfiguration {
                tool_id: ToolId::new(self.lti_id.clone()),
                launch_url: self.launch_url.clone(),
                custom_parameters: self.custom_parameters.clone(),
                open_in_new_page: self.open_in_new_page,
                has_score: self.has_score,
                weight: self.weight,
                hide_launch: self.hide_launch,
            },
        }
    }
}

/// Anonymous-id to platform user mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Anonymous id sent to tools.
    pub anonymous_id: String,
    /// Platform user id.
    pub user_id: String,
}

impl UserConfig {
    /// Validates the mapping.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_id("users.anonymous_id", &self.anonymous_id)?;
        validate_id("users.user_id", &self.user_id)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a non-empty, bounded identifier.
fn validate_id(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default placement title.
fn default_display_name() -> String {
    "LTI".to_string()
}

/// Default launch URL.
fn default_launch_url() -> String {
    "http://www.example.com".to_string()
}

/// Default placement weight.
const fn default_weight() -> f64 {
    1.0
}

/// Serde helper for `true` defaults.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
