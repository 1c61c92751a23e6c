// crates/lti-bridge-core/src/core/tool.rs
// ============================================================================
// Module: Tool Placement Model
// Description: Tool configuration, platform roles, and per-launch context.
// Purpose: Derive the stable identifiers that correlate launches and grades.
// Dependencies: serde, crate::oauth::encoding
// ============================================================================

//! ## Overview
//! A [`ToolComponent`] is one placement of an external tool inside a course.
//! [`LaunchContext`] is recomputed on every launch and every grade callback;
//! its `lis_result_sourcedid` is the correlation key that ties an external
//! grade update back to a local user, so derivation must be deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AnonymousUserId;
use crate::core::identifiers::CourseId;
use crate::core::identifiers::ToolId;
use crate::core::identifiers::UsageId;
use crate::oauth::encoding::quote;
use crate::oauth::encoding::unquote;

// ============================================================================
// SECTION: Tool Configuration
// ============================================================================

/// Author-controlled settings for a tool placement.
///
/// # Invariants
/// - `weight` is finite and non-negative (enforced by configuration loading).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfiguration {
    /// Identifier linking the placement to a course passport.
    pub tool_id: ToolId,
    /// Tool launch URL.
    pub launch_url: String,
    /// Raw `key=value` custom parameters as authored.
    pub custom_parameters: Vec<String>,
    /// Open the tool in a new page instead of an iframe.
    pub open_in_new_page: bool,
    /// Whether the tool reports grades back.
    pub has_score: bool,
    /// Points possible for this placement.
    pub weight: f64,
    /// Hide the launch button (grade-sync-only placement).
    pub hide_launch: bool,
}

impl ToolConfiguration {
    /// Returns the maximum score, or `None` when the tool is unscored.
    #[must_use]
    pub const fn max_score(&self) -> Option<f64> {
        if self.has_score { Some(self.weight) } else { None }
    }
}

impl Default for ToolConfiguration {
    fn default() -> Self {
        Self {
            tool_id: ToolId::new(""),
            launch_url: "http://www.example.com".to_string(),
            custom_parameters: Vec::new(),
            open_in_new_page: true,
            has_score: false,
            weight: 1.0,
            hide_launch: false,
        }
    }
}

/// One tool placement inside a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolComponent {
    /// Owning course.
    pub course_id: CourseId,
    /// Placement identity.
    pub usage_id: UsageId,
    /// Name shown to learners.
    pub display_name: String,
    /// Tool settings.
    pub config: ToolConfiguration,
}

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role of the current user as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    /// Enrolled learner.
    Student,
    /// Course staff.
    Staff,
    /// Course instructor.
    Instructor,
}

impl PlatformRole {
    /// Parses a platform role label; unknown labels fall back to student.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "staff" => Self::Staff,
            "instructor" => Self::Instructor,
            _ => Self::Student,
        }
    }

    /// Maps the platform role to its LTI role.
    #[must_use]
    pub const fn lti_role(self) -> LtiRole {
        match self {
            Self::Student => LtiRole::Student,
            Self::Staff => LtiRole::Administrator,
            Self::Instructor => LtiRole::Instructor,
        }
    }
}

/// LTI 1.1 role vocabulary sent to tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LtiRole {
    /// `Student`.
    Student,
    /// `Administrator`.
    Administrator,
    /// `Instructor`.
    Instructor,
}

impl LtiRole {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Administrator => "Administrator",
            Self::Instructor => "Instructor",
        }
    }
}

// ============================================================================
// SECTION: Launch Context
// ============================================================================

/// Per-launch identifiers sent to the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchContext {
    /// Percent-encoded anonymous user id.
    pub user_id: String,
    /// Course identifier (`context_id`).
    pub context_id: String,
    /// Stable placement identifier derived from host and element id.
    pub resource_link_id: String,
    /// `context:resource_link:user` correlation key.
    pub result_sourced_id: String,
    /// LTI role of the launching user.
    pub role: LtiRole,
}

impl LaunchContext {
    /// Derives the launch context for a user of a placement.
    #[must_use]
    pub fn derive(
        component: &ToolComponent,
        hostname: &str,
        anonymous_id: &AnonymousUserId,
        role: PlatformRole,
    ) -> Self {
        let user_id = quote(anonymous_id.as_str());
        let context_id = component.course_id.as_str().to_string();
        let resource_link_id =
            quote(&format!("{hostname}-{}", component.usage_id.html_id()));
        let result_sourced_id =
            format!("{}:{}:{}", quote(&context_id), resource_link_id, user_id);
        Self {
            user_id,
            context_id,
            resource_link_id,
            result_sourced_id,
            role: role.lti_role(),
        }
    }
}

/// Recovers the anonymous user id from a `lis_result_sourcedid`.
///
/// The id is the segment after the last `:`, percent-decoded.
#[must_use]
pub fn anonymous_id_from_sourced_id(sourced_id: &str) -> AnonymousUserId {
    let segment = sourced_id.rsplit(':').next().unwrap_or_default();
    AnonymousUserId::new(unquote(segment))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
