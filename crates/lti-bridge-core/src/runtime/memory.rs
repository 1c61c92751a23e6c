// crates/lti-bridge-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Collaborators
// Description: Mutex-backed implementations of the collaborator interfaces.
// Purpose: Back the standalone service and tests without external storage.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! These implementations keep all state in process memory. Poisoned locks
//! surface as errors rather than panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::AnonymousUserId;
use crate::core::CourseId;
use crate::core::GradeKey;
use crate::core::GradeState;
use crate::core::RealUser;
use crate::interfaces::CredentialSource;
use crate::interfaces::GradeEvent;
use crate::interfaces::GradeLedger;
use crate::interfaces::GradeStateStore;
use crate::interfaces::LedgerError;
use crate::interfaces::StoreError;
use crate::interfaces::UserDirectory;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Fixed course passport table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    /// Passports keyed by course.
    passports: BTreeMap<CourseId, Vec<String>>,
}

impl StaticCredentialSource {
    /// Creates an empty passport table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the passports of `course_id` replaced.
    #[must_use]
    pub fn with_course(mut self, course_id: CourseId, passports: Vec<String>) -> Self {
        self.passports.insert(course_id, passports);
        self
    }
}

impl CredentialSource for StaticCredentialSource {
    fn course_credentials(&self, course_id: &CourseId) -> Vec<String> {
        self.passports.get(course_id).cloned().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Fixed anonymous-id to user mapping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    /// Users keyed by anonymous id.
    users: BTreeMap<AnonymousUserId, RealUser>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more user mapping.
    #[must_use]
    pub fn with_user(mut self, anonymous_id: AnonymousUserId, user: RealUser) -> Self {
        self.users.insert(anonymous_id, user);
        self
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn resolve_real_user(&self, anonymous_id: &AnonymousUserId) -> Option<RealUser> {
        self.users.get(anonymous_id).cloned()
    }
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Ledger that records every published grade event in order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGradeLedger {
    /// Published events.
    events: Arc<Mutex<Vec<GradeEvent>>>,
}

impl InMemoryGradeLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of published events.
    #[must_use]
    pub fn events(&self) -> Vec<GradeEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl GradeLedger for InMemoryGradeLedger {
    fn publish_grade(&self, event: &GradeEvent) -> Result<(), LedgerError> {
        self.events
            .lock()
            .map_err(|_| LedgerError::Publish("grade ledger mutex poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Grade State
// ============================================================================

/// In-memory grade state cache.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGradeStateStore {
    /// Grade state keyed by placement and user.
    states: Arc<Mutex<BTreeMap<GradeKey, GradeState>>>,
}

impl InMemoryGradeStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GradeStateStore for InMemoryGradeStateStore {
    fn load(&self, key: &GradeKey) -> Result<GradeState, StoreError> {
        let guard = self
            .states
            .lock()
            .map_err(|_| StoreError::Store("grade state mutex poisoned".to_string()))?;
        Ok(guard.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &GradeKey, state: &GradeState) -> Result<(), StoreError> {
        self.states
            .lock()
            .map_err(|_| StoreError::Store("grade state mutex poisoned".to_string()))?
            .insert(key.clone(), state.clone());
        Ok(())
    }
}
