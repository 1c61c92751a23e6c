// crates/lti-bridge-core/src/runtime/grades.rs
// ============================================================================
// Module: Grade Keeper
// Description: Applies grade changes to the ledger and the local cache.
// Purpose: Enforce publish-then-cache ordering for every grade mutation.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Every mutation publishes to the ledger of record first and only updates
//! the cache once the publish succeeded. A failed publish leaves the cache
//! untouched, so the cache never reports a newer score than the ledger.
//! Concurrent callbacks for the same user resolve last-write-wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::GradeKey;
use crate::core::GradeState;
use crate::core::RawScore;
use crate::core::RealUser;
use crate::core::ToolComponent;
use crate::error::LtiError;
use crate::interfaces::GradeEvent;
use crate::interfaces::GradeLedger;
use crate::interfaces::GradeStateStore;

// ============================================================================
// SECTION: Grade Keeper
// ============================================================================

/// Applies grade changes for one placement.
pub struct GradeKeeper<'a> {
    /// Ledger of record.
    ledger: &'a dyn GradeLedger,
    /// Local grade cache.
    store: &'a dyn GradeStateStore,
}

impl<'a> GradeKeeper<'a> {
    /// Creates a grade keeper over a ledger and cache.
    #[must_use]
    pub fn new(ledger: &'a dyn GradeLedger, store: &'a dyn GradeStateStore) -> Self {
        Self {
            ledger,
            store,
        }
    }

    /// Returns the cached grade state of `user` for `component`.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Store`] when the cache is unavailable.
    pub fn load(&self, component: &ToolComponent, user: &RealUser) -> Result<GradeState, LtiError> {
        Ok(self.store.load(&grade_key(component, user))?)
    }

    /// Records a score scaled by the placement weight along with a comment.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Configuration`] for unscored placements,
    /// [`LtiError::Ledger`] when publishing fails (cache untouched), and
    /// [`LtiError::Store`] when the cache write fails.
    pub fn set_user_module_score(
        &self,
        component: &ToolComponent,
        user: &RealUser,
        score: RawScore,
        comment: &str,
    ) -> Result<GradeState, LtiError> {
        let max_score = component.config.max_score().ok_or_else(|| {
            LtiError::Configuration("tool is not configured to accept scores".to_string())
        })?;
        let scaled = score.scaled(max_score);
        self.ledger.publish_grade(&GradeEvent {
            course_id: component.course_id.clone(),
            usage_id: component.usage_id.clone(),
            user: user.clone(),
            value: Some(scaled),
            max_value: Some(max_score),
        })?;
        let state = GradeState {
            module_score: Some(scaled),
            score_comment: comment.to_string(),
        };
        self.store.save(&grade_key(component, user), &state)?;
        Ok(state)
    }

    /// Clears score and comment.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Ledger`] when publishing fails (cache untouched)
    /// and [`LtiError::Store`] when the cache write fails.
    pub fn clear_user_module_score(
        &self,
        component: &ToolComponent,
        user: &RealUser,
    ) -> Result<(), LtiError> {
        self.ledger.publish_grade(&GradeEvent {
            course_id: component.course_id.clone(),
            usage_id: component.usage_id.clone(),
            user: user.clone(),
            value: None,
            max_value: None,
        })?;
        self.store.save(&grade_key(component, user), &GradeState::default())?;
        Ok(())
    }
}

/// Builds the cache key for a placement/user pair.
fn grade_key(component: &ToolComponent, user: &RealUser) -> GradeKey {
    GradeKey {
        course_id: component.course_id.clone(),
        usage_id: component.usage_id.clone(),
        user: user.clone(),
    }
}
