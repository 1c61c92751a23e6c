// crates/lti-bridge-core/src/launch.rs
// ============================================================================
// Module: Launch Signer
// Description: Builds and signs the basic LTI launch form parameters.
// Purpose: Hand the platform a ready-to-render, OAuth1-signed launch form.
// Dependencies: crate::core, crate::oauth
// ============================================================================

//! ## Overview
//! A launch is a browser form POST to the tool. [`LaunchSigner`] assembles
//! the mandatory LTI parameters, the outcome service URL for scored
//! placements, and the author's custom parameters, then signs them with
//! HMAC-SHA1 over the trimmed launch URL.
//!
//! When signing is impossible (no shared secret, or a launch URL without a
//! scheme or host) the signer takes a named fallback path that emits a fixed
//! stub signature so the form still renders. The tool will reject it.
//!
//! `oauth_signature` is returned raw (not percent-encoded): the browser
//! encodes it once when serializing the form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::ClientCredentials;
use crate::core::GradeState;
use crate::core::LaunchContext;
use crate::core::ToolComponent;
use crate::error::LtiError;
use crate::oauth::OAuthClient;
use crate::oauth::OAuthError;
use crate::oauth::OAuthStamp;
use crate::oauth::client::OAUTH_VERSION;
use crate::oauth::signature::HMAC_SHA1;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Standard LTI 1.1 launch parameters that are passed without a `custom_` prefix.
pub const RESERVED_LAUNCH_PARAMETERS: [&str; 27] = [
    "lti_message_type",
    "lti_version",
    "resource_link_title",
    "resource_link_description",
    "user_image",
    "lis_person_name_given",
    "lis_person_name_family",
    "lis_person_name_full",
    "lis_person_contact_email_primary",
    "lis_person_sourcedid",
    "role_scope_mentor",
    "context_type",
    "context_title",
    "context_label",
    "launch_presentation_locale",
    "launch_presentation_document_target",
    "launch_presentation_css_url",
    "launch_presentation_width",
    "launch_presentation_height",
    "launch_presentation_return_url",
    "tool_consumer_info_product_family_code",
    "tool_consumer_info_version",
    "tool_consumer_instance_guid",
    "tool_consumer_instance_name",
    "tool_consumer_instance_description",
    "tool_consumer_instance_url",
    "tool_consumer_instance_contact_email",
];

/// HTTP method used for launches.
const LAUNCH_METHOD: &str = "POST";

/// Nonce of the stub signature.
const FALLBACK_NONCE: &str = "80966668944732164491378916897";

/// Timestamp of the stub signature.
const FALLBACK_TIMESTAMP: &str = "1378916897";

/// Stub signature value (already percent-decoded).
const FALLBACK_SIGNATURE: &str = "frVp4JuvT1mVXlxktiAUjQ7/1cw=";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Why a launch was signed with the stub signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No passport matched the tool, so there is no shared secret.
    MissingCredentials,
    /// The launch URL has no scheme or host.
    UnsignableLaunchUrl,
}

/// How the launch parameters were signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum LaunchSignature {
    /// Real HMAC-SHA1 signature.
    Signed,
    /// Deterministic stub signature.
    Fallback(FallbackReason),
}

/// Signed launch form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedLaunch {
    /// Trimmed form action URL.
    pub launch_url: String,
    /// OAuth and LTI form fields.
    pub parameters: BTreeMap<String, String>,
    /// Signature provenance.
    pub signature: LaunchSignature,
}

// ============================================================================
// SECTION: Custom Parameters
// ============================================================================

/// Parses authored `key=value` custom parameters.
///
/// Names and values are trimmed; names outside
/// [`RESERVED_LAUNCH_PARAMETERS`] gain a `custom_` prefix. Later entries
/// replace earlier entries with the same name.
///
/// # Errors
///
/// Returns [`LtiError::Configuration`] for an entry without `=`.
pub fn parse_custom_parameters<S: AsRef<str>>(
    raw: &[S],
) -> Result<BTreeMap<String, String>, LtiError> {
    let mut parsed = BTreeMap::new();
    for entry in raw {
        let entry = entry.as_ref();
        let Some((name, value)) = entry.split_once('=') else {
            return Err(LtiError::Configuration(format!(
                "Could not parse custom parameter: '{entry}'. Should be \"x=y\" string."
            )));
        };
        let name = name.trim();
        let name = if RESERVED_LAUNCH_PARAMETERS.contains(&name) {
            name.to_string()
        } else {
            format!("custom_{name}")
        };
        parsed.insert(name, value.trim().to_string());
    }
    Ok(parsed)
}

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Signs launches with a tool's client credentials.
#[derive(Debug, Clone)]
pub struct LaunchSigner {
    /// OAuth client bound to the resolved credentials.
    client: OAuthClient,
}

impl LaunchSigner {
    /// Creates a signer; missing credentials are allowed and force the fallback path.
    #[must_use]
    pub const fn new(credentials: ClientCredentials) -> Self {
        Self {
            client: OAuthClient::new(credentials),
        }
    }

    /// Builds the signed launch form for `component`.
    ///
    /// `outcome_service_url` is only sent for scored placements.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Configuration`] for malformed custom parameters.
    pub fn sign(
        &self,
        component: &ToolComponent,
        context: &LaunchContext,
        outcome_service_url: &str,
        stamp: &OAuthStamp,
    ) -> Result<SignedLaunch, LtiError> {
        let mut body = BTreeMap::new();
        body.insert("user_id".to_string(), context.user_id.clone());
        body.insert("oauth_callback".to_string(), "about:blank".to_string());
        body.insert("launch_presentation_return_url".to_string(), String::new());
        body.insert("lti_message_type".to_string(), "basic-lti-launch-request".to_string());
        body.insert("lti_version".to_string(), "LTI-1p0".to_string());
        body.insert("roles".to_string(), context.role.as_str().to_string());
        body.insert("resource_link_id".to_string(), context.resource_link_id.clone());
        body.insert("lis_result_sourcedid".to_string(), context.result_sourced_id.clone());
        body.insert("context_id".to_string(), context.context_id.clone());
        if component.config.has_score {
            body.insert("lis_outcome_service_url".to_string(), outcome_service_url.to_string());
        }
        body.extend(parse_custom_parameters(&component.config.custom_parameters)?);

        let launch_url = component.config.launch_url.trim().to_string();
        let (oauth, signature) = self.oauth_parameters(&launch_url, &body, stamp)?;

        let mut parameters: BTreeMap<String, String> = oauth.into_iter().collect();
        parameters.extend(body);
        Ok(SignedLaunch {
            launch_url,
            parameters,
            signature,
        })
    }

    /// Signs `body`, falling back to the stub signature when signing is impossible.
    fn oauth_parameters(
        &self,
        launch_url: &str,
        body: &BTreeMap<String, String>,
        stamp: &OAuthStamp,
    ) -> Result<(Vec<(String, String)>, LaunchSignature), LtiError> {
        if self.client.credentials().is_missing() {
            return Ok(self.fallback(FallbackReason::MissingCredentials));
        }
        let pairs: Vec<(String, String)> =
            body.iter().map(|(name, value)| (name.clone(), value.clone())).collect();
        match self.client.sign_form(LAUNCH_METHOD, launch_url, &pairs, stamp) {
            Ok(params) => Ok((params, LaunchSignature::Signed)),
            Err(OAuthError::InvalidUri(_)) => {
                Ok(self.fallback(FallbackReason::UnsignableLaunchUrl))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the stub protocol parameters.
    fn fallback(&self, reason: FallbackReason) -> (Vec<(String, String)>, LaunchSignature) {
        let params = vec![
            ("oauth_nonce".to_string(), FALLBACK_NONCE.to_string()),
            ("oauth_timestamp".to_string(), FALLBACK_TIMESTAMP.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
            ("oauth_signature_method".to_string(), HMAC_SHA1.to_string()),
            ("oauth_consumer_key".to_string(), self.client.credentials().key.clone()),
            ("oauth_signature".to_string(), FALLBACK_SIGNATURE.to_string()),
        ];
        (params, LaunchSignature::Fallback(reason))
    }
}

// ============================================================================
// SECTION: Launch View
// ============================================================================

/// Render context for the launch widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchView {
    /// Hidden form fields.
    pub input_fields: BTreeMap<String, String>,
    /// Form action URL.
    pub launch_url: String,
    /// DOM-safe element id of the placement.
    pub element_id: String,
    /// Placement title.
    pub display_name: String,
    /// Open the tool in a new page.
    pub open_in_new_page: bool,
    /// Hide the launch button.
    pub hide_launch: bool,
    /// Whether the placement is graded.
    pub has_score: bool,
    /// Points possible.
    pub weight: f64,
    /// Cached weighted score.
    pub module_score: Option<f64>,
    /// Stored comment, HTML-escaped.
    pub comment: String,
    /// Signature provenance.
    pub signature: LaunchSignature,
}

impl LaunchView {
    /// Combines a signed launch with the placement's cached grade state.
    #[must_use]
    pub fn new(component: &ToolComponent, launch: SignedLaunch, grade: &GradeState) -> Self {
        Self {
            input_fields: launch.parameters,
            launch_url: launch.launch_url,
            element_id: component.usage_id.html_id(),
            display_name: component.display_name.clone(),
            open_in_new_page: component.config.open_in_new_page,
            hide_launch: component.config.hide_launch,
            has_score: component.config.has_score,
            weight: component.config.weight,
            module_score: grade.module_score,
            comment: escape_html(&grade.score_comment),
            signature: launch.signature,
        }
    }
}

/// Escapes markup-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

// ============================================================================
// SECTION: Tests
// ============================================================================
