// crates/lti-bridge-core/src/outcomes/passback.rs
// ============================================================================
// Module: LTI 1.1 Grade Passback
// Description: POX XML request parsing and response envelope rendering.
// Purpose: Apply replaceResult callbacks and answer every request with XML.
// Dependencies: roxmltree, crate::oauth, crate::runtime
// ============================================================================

//! ## Overview
//! The v1.1 endpoint always answers HTTP 200 with an XML envelope; the
//! outcome is carried by `imsx_codeMajor`. Request processing moves through
//! these states, any of which may reject:
//!
//! 1. structural parse (message id, `sourcedId`, score text, action)
//! 2. body-hash and signature verification
//! 3. score validation
//! 4. user resolution from the last `sourcedId` segment
//! 5. action dispatch (`replaceResultRequest` only, others are unsupported)
//!
//! Parse and score failures echo the message identifier `unknown`; later
//! failures echo the parsed identifier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use roxmltree::Document;
use roxmltree::Node;

use crate::core::RawScore;
use crate::core::tool::anonymous_id_from_sourced_id;
use crate::error::LtiError;
use crate::oauth::BodySignatureVerifier;
use crate::oauth::SignedRequest;
use crate::outcomes::GradeSyncContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Namespace of LTI 1.1 outcome messages.
pub const LTI_1_1_NAMESPACE: &str = "http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0";

/// Content type of every v1.1 response.
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// The only supported action.
pub const REPLACE_RESULT_ACTION: &str = "replaceResultRequest";

/// Message identifier echoed when none could be extracted.
const UNKNOWN_MESSAGE_ID: &str = "unknown";

/// Default failure description.
const FAILURE_DESCRIPTION: &str = "The request has failed.";

/// Unsupported-action description.
const UNSUPPORTED_DESCRIPTION: &str = "Target does not support the requested operation.";

// ============================================================================
// SECTION: Request Parsing
// ============================================================================

/// Fields extracted from a POX request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRequest {
    /// `imsx_messageIdentifier` text.
    pub message_identifier: String,
    /// `sourcedId` text.
    pub sourced_id: String,
    /// Unvalidated `textString` score.
    pub score_text: String,
    /// Local name of the first element under `imsx_POXBody`.
    pub action: String,
}

/// Extracts the grade request fields from a POX XML body.
///
/// Element lookup is namespace-qualified and document-wide; the score text
/// is not validated here.
///
/// # Errors
///
/// Returns [`LtiError::ProtocolParse`] for non-UTF-8 or malformed XML and
/// for any missing element.
pub fn parse_grade_request(body: &[u8]) -> Result<GradeRequest, LtiError> {
    let text = std::str::from_utf8(body)
        .map_err(|err| LtiError::ProtocolParse(format!("body is not UTF-8: {err}")))?;
    let document =
        Document::parse(text.trim()).map_err(|err| LtiError::ProtocolParse(err.to_string()))?;

    let message_identifier = element_text(&document, "imsx_messageIdentifier")?;
    let sourced_id = element_text(&document, "sourcedId")?;
    let score_text = element_text(&document, "textString")?;
    let action = find_element(&document, "imsx_POXBody")?
        .children()
        .find(Node::is_element)
        .map(|node| node.tag_name().name().to_string())
        .ok_or_else(|| LtiError::ProtocolParse("imsx_POXBody has no action element".to_string()))?;

    Ok(GradeRequest {
        message_identifier,
        sourced_id,
        score_text,
        action,
    })
}

/// Finds the first element with the given local name in the LTI namespace.
fn find_element<'a, 'input>(
    document: &'a Document<'input>,
    name: &str,
) -> Result<Node<'a, 'input>, LtiError> {
    document
        .descendants()
        .find(|node| node.has_tag_name((LTI_1_1_NAMESPACE, name)))
        .ok_or_else(|| LtiError::ProtocolParse(format!("missing element {name}")))
}

/// Returns the text content of an element (empty when it has none).
fn element_text(document: &Document<'_>, name: &str) -> Result<String, LtiError> {
    Ok(find_element(document, name)?.text().unwrap_or_default().to_string())
}

// ============================================================================
// SECTION: Response Envelope
// ============================================================================

/// `imsx_codeMajor` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMajor {
    /// Request applied.
    Success,
    /// Request rejected.
    Failure,
    /// Action not implemented.
    Unsupported,
}

impl CodeMajor {
    /// Returns the wire literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unsupported => "unsupported",
        }
    }
}

/// POX response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Echoed request identifier.
    pub message_identifier: String,
    /// Outcome class.
    pub code_major: CodeMajor,
    /// Human-readable status.
    pub description: String,
    /// Raw XML placed in `imsx_POXBody`.
    pub response_body: &'static str,
}

impl ResponseEnvelope {
    /// Builds a failure envelope.
    #[must_use]
    pub fn failure(message_identifier: &str, description: impl Into<String>) -> Self {
        Self {
            message_identifier: message_identifier.to_string(),
            code_major: CodeMajor::Failure,
            description: description.into(),
            response_body: "",
        }
    }

    /// Renders the envelope; interpolated text is XML-escaped.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeResponse xmlns="{namespace}">
    <imsx_POXHeader>
        <imsx_POXResponseHeaderInfo>
            <imsx_version>V1.0</imsx_version>
            <imsx_messageIdentifier>{message_identifier}</imsx_messageIdentifier>
            <imsx_statusInfo>
                <imsx_codeMajor>{code_major}</imsx_codeMajor>
                <imsx_severity>status</imsx_severity>
                <imsx_description>{description}</imsx_description>
                <imsx_messageRefIdentifier>
                </imsx_messageRefIdentifier>
            </imsx_statusInfo>
        </imsx_POXResponseHeaderInfo>
    </imsx_POXHeader>
    <imsx_POXBody>{response_body}</imsx_POXBody>
</imsx_POXEnvelopeResponse>
"#,
            namespace = LTI_1_1_NAMESPACE,
            message_identifier = escape_xml(&self.message_identifier),
            code_major = self.code_major.as_str(),
            description = escape_xml(&self.description),
            response_body = self.response_body,
        )
    }
}

/// Escapes XML character data.
#[must_use]
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Formats a score with at least one decimal place (`1` renders as `1.0`).
#[must_use]
pub fn format_score(score: f64) -> String {
    let rendered = format!("{score}");
    if rendered.contains(['.', 'e', 'E']) || !score.is_finite() {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Applied outcome of a passback request.
#[derive(Debug, Clone, PartialEq)]
pub enum PassbackAction {
    /// Score replaced; `score` is the raw `[0, 1]` value.
    Replaced {
        /// Raw score reported by the tool.
        score: f64,
    },
    /// Well-formed request for an action other than `replaceResultRequest`.
    Unsupported {
        /// Requested action name.
        action: String,
    },
}

/// Envelope to return plus the classified result for auditing.
#[derive(Debug, Clone, PartialEq)]
pub struct PassbackReply {
    /// Rendered XML envelope (always sent with HTTP 200).
    pub envelope: String,
    /// What happened.
    pub result: Result<PassbackAction, LtiError>,
}

impl PassbackReply {
    /// Builds a rejected reply.
    fn rejected(envelope: &ResponseEnvelope, error: LtiError) -> Self {
        Self {
            envelope: envelope.render(),
            result: Err(error),
        }
    }

    /// Builds the reply for a placement whose credentials cannot be resolved.
    #[must_use]
    pub fn credential_failure(error: LtiError) -> Self {
        let envelope =
            ResponseEnvelope::failure(UNKNOWN_MESSAGE_ID, format!("OAuth verification error: {error}"));
        Self::rejected(&envelope, error)
    }

    /// Builds the reply for a body larger than the transport accepts.
    #[must_use]
    pub fn body_too_large(limit: usize) -> Self {
        parse_failure(LtiError::ProtocolParse(format!("request body exceeds {limit} bytes")))
    }
}

/// Handles a v1.1 grade passback request.
#[must_use]
pub fn handle_grade_passback(ctx: &GradeSyncContext<'_>, request: &SignedRequest<'_>) -> PassbackReply {
    let parsed = match parse_grade_request(request.body) {
        Ok(parsed) => parsed,
        Err(err) => return parse_failure(err),
    };

    if let Err(err) = BodySignatureVerifier::new(ctx.credentials).verify(request) {
        let envelope = ResponseEnvelope::failure(
            &parsed.message_identifier,
            format!("OAuth verification error: {err}"),
        );
        return PassbackReply::rejected(&envelope, err.into());
    }

    let score = match RawScore::parse(&parsed.score_text) {
        Ok(score) => score,
        Err(err) => return parse_failure(err.into()),
    };

    let anonymous_id = anonymous_id_from_sourced_id(&parsed.sourced_id);
    let Some(user) = ctx.users.resolve_real_user(&anonymous_id) else {
        let envelope = ResponseEnvelope::failure(&parsed.message_identifier, "User not found.");
        return PassbackReply::rejected(
            &envelope,
            LtiError::UserResolution(format!("no user for anonymous id {anonymous_id}")),
        );
    };

    if parsed.action != REPLACE_RESULT_ACTION {
        let envelope = ResponseEnvelope {
            message_identifier: parsed.message_identifier,
            code_major: CodeMajor::Unsupported,
            description: UNSUPPORTED_DESCRIPTION.to_string(),
            response_body: "",
        };
        return PassbackReply {
            envelope: envelope.render(),
            result: Ok(PassbackAction::Unsupported {
                action: parsed.action,
            }),
        };
    }

    if let Err(err) = ctx.grades.set_user_module_score(ctx.component, &user, score, "") {
        let envelope = ResponseEnvelope::failure(&parsed.message_identifier, FAILURE_DESCRIPTION);
        return PassbackReply::rejected(&envelope, err);
    }

    let envelope = ResponseEnvelope {
        message_identifier: parsed.message_identifier,
        code_major: CodeMajor::Success,
        description: format!(
            "Score for {} is now {}",
            parsed.sourced_id,
            format_score(score.value())
        ),
        response_body: "<replaceResultResponse/>",
    };
    PassbackReply {
        envelope: envelope.render(),
        result: Ok(PassbackAction::Replaced {
            score: score.value(),
        }),
    }
}

/// Builds the parsing-error reply.
fn parse_failure(err: LtiError) -> PassbackReply {
    let detail = match &err {
        LtiError::ProtocolParse(detail) => detail.clone(),
        other => other.to_string(),
    };
    let envelope = ResponseEnvelope::failure(
        UNKNOWN_MESSAGE_ID,
        format!("Request body XML parsing error: {detail}"),
    );
    PassbackReply::rejected(&envelope, err)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
