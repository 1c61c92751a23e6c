// crates/lti-bridge-core/src/runtime/service.rs
// ============================================================================
// Module: LTI Service
// Description: Facade composing launch signing and grade-sync handlers.
// Purpose: Give transports one entry point per LTI exchange.
// Dependencies: crate::interfaces, crate::launch, crate::outcomes
// ============================================================================

//! ## Overview
//! [`LtiService`] owns the injected collaborators and resolves a placement's
//! credentials from its course passports on every exchange. Launch returns
//! a render context; the grade handlers return complete replies that the
//! transport sends verbatim.
//!
//! Inbound callbacks are untrusted until the body hash and signature verify.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;

use crate::core::ClientCredentials;
use crate::core::GradeState;
use crate::core::LaunchContext;
use crate::core::RealUser;
use crate::core::ToolComponent;
use crate::core::resolve_client_credentials;
use crate::error::LtiError;
use crate::interfaces::CredentialSource;
use crate::interfaces::GradeLedger;
use crate::interfaces::GradeStateStore;
use crate::interfaces::LaunchEnvironment;
use crate::interfaces::UserDirectory;
use crate::launch::LaunchSigner;
use crate::launch::LaunchView;
use crate::oauth::OAuthClient;
use crate::oauth::OAuthStamp;
use crate::oauth::SignedRequest;
use crate::oauth::signature::body_hash;
use crate::outcomes::GradeSyncContext;
use crate::outcomes::PassbackReply;
use crate::outcomes::ResultReply;
use crate::outcomes::handle_grade_passback;
use crate::outcomes::handle_result_request;
use crate::runtime::GradeKeeper;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authorization a correctly configured tool would have sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationHint {
    /// `oauth_body_hash` of the received body.
    pub body_hash: String,
    /// Complete `Authorization` header value.
    pub authorization: String,
}

/// LTI bridge entry points over injected collaborators.
#[derive(Clone)]
pub struct LtiService {
    /// Course passport source.
    credentials: Arc<dyn CredentialSource>,
    /// Anonymous-id resolution.
    users: Arc<dyn UserDirectory>,
    /// Ledger of record.
    ledger: Arc<dyn GradeLedger>,
    /// Local grade cache.
    store: Arc<dyn GradeStateStore>,
}

impl LtiService {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn GradeLedger>,
        store: Arc<dyn GradeStateStore>,
    ) -> Self {
        Self {
            credentials,
            users,
            ledger,
            store,
        }
    }

    /// Resolves the client credentials of a placement.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Configuration`] when a course passport is malformed.
    pub fn client_credentials(&self, component: &ToolComponent) -> Result<ClientCredentials, LtiError> {
        let passports = self.credentials.course_credentials(&component.course_id);
        Ok(resolve_client_credentials(&component.config.tool_id, &passports)?)
    }

    /// Builds the signed launch form and its render context.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Configuration`] for malformed passports or custom
    /// parameters and [`LtiError::Store`] when the grade cache is unavailable.
    pub fn launch(
        &self,
        component: &ToolComponent,
        env: &dyn LaunchEnvironment,
        stamp: &OAuthStamp,
    ) -> Result<LaunchView, LtiError> {
        let credentials = self.client_credentials(component)?;
        let anonymous_id = env.anonymous_user_id();
        let context = LaunchContext::derive(
            component,
            &env.current_hostname(),
            &anonymous_id,
            env.current_user_role(),
        );
        let signed = LaunchSigner::new(credentials).sign(
            component,
            &context,
            &env.outcome_service_url(component),
            stamp,
        )?;
        let grade = match self.users.resolve_real_user(&anonymous_id) {
            Some(user) => self.grade_state(component, &user)?,
            None => GradeState::default(),
        };
        Ok(LaunchView::new(component, signed, &grade))
    }

    /// Handles a v1.1 grade passback request.
    #[must_use]
    pub fn grade_passback(&self, component: &ToolComponent, request: &SignedRequest<'_>) -> PassbackReply {
        match self.client_credentials(component) {
            Ok(credentials) => handle_grade_passback(&self.sync_context(component, &credentials), request),
            Err(err) => PassbackReply::credential_failure(err),
        }
    }

    /// Handles a v2.0 result service request.
    #[must_use]
    pub fn result_service(
        &self,
        component: &ToolComponent,
        suffix: &str,
        request: &SignedRequest<'_>,
    ) -> ResultReply {
        match self.client_credentials(component) {
            Ok(credentials) => {
                handle_result_request(&self.sync_context(component, &credentials), suffix, request)
            }
            Err(err) => ResultReply::credential_failure(err),
        }
    }

    /// Returns the cached grade state of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Store`] when the grade cache is unavailable.
    pub fn grade_state(&self, component: &ToolComponent, user: &RealUser) -> Result<GradeState, LtiError> {
        GradeKeeper::new(self.ledger.as_ref(), self.store.as_ref()).load(component, user)
    }

    /// Computes the Authorization header a tool should send for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`LtiError::Configuration`] for malformed passports and
    /// [`LtiError::Authentication`] when the request URL cannot be signed.
    pub fn authorization_hint(
        &self,
        component: &ToolComponent,
        request: &SignedRequest<'_>,
        stamp: &OAuthStamp,
    ) -> Result<AuthorizationHint, LtiError> {
        let client = OAuthClient::new(self.client_credentials(component)?);
        let authorization = client.sign_body(request.method, request.url, request.body, stamp)?;
        Ok(AuthorizationHint {
            body_hash: body_hash(request.body),
            authorization,
        })
    }

    /// Bundles collaborators for one grade callback.
    fn sync_context<'a>(
        &'a self,
        component: &'a ToolComponent,
        credentials: &'a ClientCredentials,
    ) -> GradeSyncContext<'a> {
        GradeSyncContext {
            component,
            credentials,
            users: self.users.as_ref(),
            grades: GradeKeeper::new(self.ledger.as_ref(), self.store.as_ref()),
        }
    }
}
