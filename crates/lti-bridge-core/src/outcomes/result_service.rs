// crates/lti-bridge-core/src/outcomes/result_service.rs
// ============================================================================
// Module: LTI 2.0 Result Service
// Description: REST handler for the `Result` resource (GET, PUT, DELETE).
// Purpose: Expose per-user grade state to tools as JSON-LD documents.
// Dependencies: serde, serde_json, crate::oauth, crate::runtime
// ============================================================================

//! ## Overview
//! The result service addresses one user's result through a URL suffix of
//! the form `user/<anon_id>`. Failures carry no body: 404 for a bad suffix,
//! unknown user, unparseable document, unsupported method, or unscored
//! placement; 401 for content-type, body-hash, or signature failures; 500
//! when the ledger or cache fails.
//!
//! A PUT without `resultScore` clears the result exactly like DELETE.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::AnonymousUserId;
use crate::core::RawScore;
use crate::error::LtiError;
use crate::oauth::BodySignatureVerifier;
use crate::oauth::SignedRequest;
use crate::outcomes::GradeSyncContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mandatory request and response media type.
pub const RESULT_CONTENT_TYPE: &str = "application/vnd.ims.lis.v2.result+json";

/// JSON-LD context of `Result` documents.
pub const RESULT_CONTEXT: &str = "http://purl.imsglobal.org/ctx/lis/v2/Result";

/// JSON-LD type of `Result` documents.
pub const RESULT_TYPE: &str = "Result";

/// Required suffix prefix.
const SUFFIX_PREFIX: &str = "user/";

/// HTTP 200.
const STATUS_OK: u16 = 200;
/// HTTP 401.
const STATUS_UNAUTHORIZED: u16 = 401;
/// HTTP 404.
const STATUS_NOT_FOUND: u16 = 404;
/// HTTP 500.
const STATUS_INTERNAL_ERROR: u16 = 500;

// ============================================================================
// SECTION: Suffix
// ============================================================================

/// Extracts the anonymous user id from a `user/<anon_id>` suffix.
///
/// The id is the longest run of word characters (alphanumerics or `_`)
/// after the prefix; anything following it is ignored.
///
/// # Errors
///
/// Returns [`LtiError::ProtocolParse`] when the suffix does not start with
/// `user/` followed by at least one word character.
pub fn parse_handler_suffix(suffix: &str) -> Result<AnonymousUserId, LtiError> {
    let invalid = || LtiError::ProtocolParse("No valid user id found in endpoint URL".to_string());
    let rest = suffix.strip_prefix(SUFFIX_PREFIX).ok_or_else(invalid)?;
    let end = rest
        .char_indices()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
        .map_or(rest.len(), |(index, _)| index);
    if end == 0 {
        return Err(invalid());
    }
    Ok(AnonymousUserId::new(&rest[..end]))
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// `Result` document returned by GET.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDocument {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: &'static str,
    /// JSON-LD type.
    #[serde(rename = "@type")]
    pub kind: &'static str,
    /// Stored score rounded to two places.
    #[serde(rename = "resultScore", skip_serializing_if = "Option::is_none")]
    pub result_score: Option<f64>,
    /// Stored comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ResultDocument {
    /// Document for a user who was never graded.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            context: RESULT_CONTEXT,
            kind: RESULT_TYPE,
            result_score: None,
            comment: None,
        }
    }
}

/// Validated PUT payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultUpdate {
    /// New raw score; `None` clears the result.
    pub score: Option<RawScore>,
    /// Comment (empty when absent).
    pub comment: String,
}

/// Parses and validates a PUT body.
///
/// The body must be a JSON object, or an array whose first element is an
/// object. The object needs `"@type": "Result"` and an `@context` key.
///
/// # Errors
///
/// Returns [`LtiError::ProtocolParse`] for any decoding or validation failure.
pub fn parse_result_json(body: &[u8]) -> Result<ResultUpdate, LtiError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        LtiError::ProtocolParse(format!(
            "Supplied JSON string in request body could not be decoded: {err}"
        ))
    })?;
    let object = match &value {
        Value::Object(object) => object,
        Value::Array(items) => match items.first() {
            Some(Value::Object(object)) => object,
            _ => {
                return Err(LtiError::ProtocolParse(
                    "Supplied JSON array does not contain an object as the first element".to_string(),
                ));
            }
        },
        _ => {
            return Err(LtiError::ProtocolParse(
                "Supplied JSON is neither an object nor an array".to_string(),
            ));
        }
    };

    match object.get("@type") {
        Some(Value::String(kind)) if kind == RESULT_TYPE => {}
        other => {
            return Err(LtiError::ProtocolParse(format!(
                "JSON object does not contain correct @type attribute (should be 'Result', is {})",
                other.map_or_else(|| "None".to_string(), Value::to_string)
            )));
        }
    }
    if !object.contains_key("@context") {
        return Err(LtiError::ProtocolParse(
            "JSON object does not contain required key @context".to_string(),
        ));
    }

    let score = match object.get("resultScore") {
        None => {
            return Ok(ResultUpdate {
                score: None,
                comment: String::new(),
            });
        }
        Some(Value::Number(number)) => {
            let value = number.as_f64().ok_or_else(|| {
                LtiError::ProtocolParse("Could not convert resultScore to float".to_string())
            })?;
            Some(RawScore::new(value)?)
        }
        Some(Value::String(text)) => Some(RawScore::parse(text)?),
        Some(other) => {
            return Err(LtiError::ProtocolParse(format!(
                "Could not convert resultScore to float: {other}"
            )));
        }
    };

    // Only consulted when a score is applied; a clear ignores it.
    let comment = match object.get("comment") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(comment)) => comment.clone(),
        Some(_) => {
            return Err(LtiError::ProtocolParse("comment must be a string".to_string()));
        }
    };

    Ok(ResultUpdate {
        score,
        comment,
    })
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// HTTP methods the result service distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMethod {
    /// Read the result.
    Get,
    /// Replace or clear the result.
    Put,
    /// Clear the result.
    Delete,
    /// Anything else (answered with 404).
    Other,
}

impl ResultMethod {
    /// Classifies an HTTP method name (case-sensitive, as on the wire).
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        match method {
            "GET" => Self::Get,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// What a successful request did.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOutcome {
    /// Result read.
    Fetched,
    /// Result set to the given raw score.
    Updated {
        /// Raw score reported by the tool.
        score: f64,
    },
    /// Result cleared.
    Cleared,
}

/// HTTP reply plus the classified result for auditing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultReply {
    /// HTTP status code.
    pub status: u16,
    /// JSON body (GET success only), sent as [`RESULT_CONTENT_TYPE`].
    pub body: Option<String>,
    /// What happened.
    pub outcome: Result<ResultOutcome, LtiError>,
}

impl ResultReply {
    /// Empty-bodied success.
    const fn ok(outcome: ResultOutcome) -> Self {
        Self {
            status: STATUS_OK,
            body: None,
            outcome: Ok(outcome),
        }
    }

    /// Builds the 401 reply for a placement whose credentials cannot be resolved.
    #[must_use]
    pub const fn credential_failure(error: LtiError) -> Self {
        Self {
            status: STATUS_UNAUTHORIZED,
            body: None,
            outcome: Err(error),
        }
    }

    /// Empty-bodied rejection with a status chosen from the error kind.
    fn rejected(error: LtiError) -> Self {
        let status = match &error {
            LtiError::Authentication(_) => STATUS_UNAUTHORIZED,
            LtiError::Ledger(_) | LtiError::Store(_) => STATUS_INTERNAL_ERROR,
            LtiError::Configuration(_)
            | LtiError::ProtocolParse(_)
            | LtiError::UserResolution(_) => STATUS_NOT_FOUND,
        };
        Self {
            status,
            body: None,
            outcome: Err(error),
        }
    }
}

/// Handles a v2.0 result service request addressed by `suffix`.
#[must_use]
pub fn handle_result_request(
    ctx: &GradeSyncContext<'_>,
    suffix: &str,
    request: &SignedRequest<'_>,
) -> ResultReply {
    match dispatch(ctx, suffix, request) {
        Ok(reply) => reply,
        Err(err) => ResultReply::rejected(err),
    }
}

/// Runs suffix, verification, user, and method stages in order.
fn dispatch(
    ctx: &GradeSyncContext<'_>,
    suffix: &str,
    request: &SignedRequest<'_>,
) -> Result<ResultReply, LtiError> {
    let anonymous_id = parse_handler_suffix(suffix)?;
    BodySignatureVerifier::new(ctx.credentials)
        .with_content_type(RESULT_CONTENT_TYPE)
        .verify(request)?;
    let user = ctx.users.resolve_real_user(&anonymous_id).ok_or_else(|| {
        LtiError::UserResolution(format!("Real user not found against anon_id: {anonymous_id}"))
    })?;

    match ResultMethod::from_method(request.method) {
        ResultMethod::Get => {
            let state = ctx.grades.load(ctx.component, &user)?;
            let document = match state.rounded_score() {
                None => ResultDocument::empty(),
                Some(score) => ResultDocument {
                    result_score: Some(score),
                    comment: Some(state.score_comment),
                    ..ResultDocument::empty()
                },
            };
            let body = serde_json::to_string(&document)
                .map_err(|err| LtiError::Store(format!("result serialization failed: {err}")))?;
            Ok(ResultReply {
                status: STATUS_OK,
                body: Some(body),
                outcome: Ok(ResultOutcome::Fetched),
            })
        }
        ResultMethod::Delete => {
            ctx.grades.clear_user_module_score(ctx.component, &user)?;
            Ok(ResultReply::ok(ResultOutcome::Cleared))
        }
        ResultMethod::Put => {
            let update = parse_result_json(request.body)?;
            match update.score {
                None => {
                    ctx.grades.clear_user_module_score(ctx.component, &user)?;
                    Ok(ResultReply::ok(ResultOutcome::Cleared))
                }
                Some(score) => {
                    ctx.grades.set_user_module_score(ctx.component, &user, score, &update.comment)?;
                    Ok(ResultReply::ok(ResultOutcome::Updated {
                        score: score.value(),
                    }))
                }
            }
        }
        ResultMethod::Other => Err(LtiError::ProtocolParse(format!(
            "unsupported method {}",
            request.method
        ))),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
