// crates/lti-bridge-core/src/core/grade.rs
// ============================================================================
// Module: Grade Model
// Description: Validated raw scores and cached per-user grade state.
// Purpose: Enforce the [0, 1] score range before any state change.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Tools report a raw score in `[0, 1]`. The platform stores the score scaled
//! by the placement weight, so a present `module_score` always equals
//! `raw * weight`. Range validation lives in [`RawScore`] so an out-of-range
//! value cannot reach the grade runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CourseId;
use crate::core::identifiers::RealUser;
use crate::core::identifiers::UsageId;

// ============================================================================
// SECTION: Raw Score
// ============================================================================

/// Score reported by a tool, guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RawScore(f64);

impl RawScore {
    /// Validates a numeric score.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::OutOfRange`] when the value is outside `[0, 1]`
    /// (including NaN and infinities).
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoreError::OutOfRange)
        }
    }

    /// Parses a textual score (surrounding whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::NotNumeric`] when the text is not a number and
    /// [`ScoreError::OutOfRange`] when it is outside `[0, 1]`.
    pub fn parse(text: &str) -> Result<Self, ScoreError> {
        let value: f64 =
            text.trim().parse().map_err(|_| ScoreError::NotNumeric(text.trim().to_string()))?;
        Self::new(value)
    }

    /// Returns the score value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns the score scaled by a maximum score.
    #[must_use]
    pub fn scaled(self, max_score: f64) -> f64 {
        self.0 * max_score
    }
}

/// Score validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// Score is not a number.
    #[error("could not convert score to float: '{0}'")]
    NotNumeric(String),
    /// Score is outside `[0, 1]`.
    #[error("score value outside the permitted range of 0-1.")]
    OutOfRange,
}

// ============================================================================
// SECTION: Grade State
// ============================================================================

/// Identifies the grade state of one user for one placement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GradeKey {
    /// Owning course.
    pub course_id: CourseId,
    /// Tool placement.
    pub usage_id: UsageId,
    /// Platform user.
    pub user: RealUser,
}

/// Cached grade state for a placement/user pair.
///
/// # Invariants
/// - `module_score`, when present, equals a validated raw score times weight.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradeState {
    /// Weighted score, absent when never graded or cleared.
    pub module_score: Option<f64>,
    /// Grader comment, stored verbatim.
    pub score_comment: String,
}

impl GradeState {
    /// Returns the stored score rounded to two decimal places.
    #[must_use]
    pub fn rounded_score(&self) -> Option<f64> {
        self.module_score.map(|score| (score * 100.0).round() / 100.0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
