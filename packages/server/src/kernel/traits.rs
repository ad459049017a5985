// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Authorization decisions live in domains/policy; these traits are the seams
// to the policy store and the hosted auth provider so tests can swap in fakes.
//
// Naming convention: Base* for trait names (e.g., BasePolicyStore, BaseAuthProvider)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::auth::{SessionCookies, SessionResolution, SessionTokens, Subject};
use crate::domains::employees::NewEmployee;
use crate::domains::policy::{PolicyRule, PolicySet, RoleAssignment};

// =============================================================================
// Policy Store Trait (Infrastructure - persisted policy set)
// =============================================================================

#[async_trait]
pub trait BasePolicyStore: Send + Sync {
    /// Load every persisted rule and role assignment
    async fn load_policy(&self) -> Result<PolicySet>;

    /// Persist a rule. Returns false if an identical rule already exists.
    async fn add_rule(&self, rule: &PolicyRule) -> Result<bool>;

    /// Remove a rule. Returns false if no such rule was stored.
    async fn remove_rule(&self, rule: &PolicyRule) -> Result<bool>;

    /// Persist a subject -> role assignment
    async fn add_assignment(&self, assignment: &RoleAssignment) -> Result<bool>;

    /// Remove a subject -> role assignment
    async fn remove_assignment(&self, assignment: &RoleAssignment) -> Result<bool>;

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Auth Provider Trait (Infrastructure - hosted identity service)
// =============================================================================

#[async_trait]
pub trait BaseAuthProvider: Send + Sync {
    /// Validate the caller's session, refreshing it when the access token is
    /// stale.
    ///
    /// Provider failures are errors; an absent or rejected session is
    /// `Ok` with `subject: None`. When `refreshed` is set, the caller must
    /// write the new tokens back to the outgoing response.
    async fn resolve_session(&self, cookies: &SessionCookies) -> Result<SessionResolution>;

    /// Exchange credentials for a new session. `Ok(None)` means the
    /// credentials were rejected.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<(Subject, SessionTokens)>>;

    /// Revoke the session behind an access token
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

// =============================================================================
// Auth Admin Trait (Infrastructure - elevated identity operations)
// =============================================================================

#[async_trait]
pub trait BaseAuthAdmin: Send + Sync {
    /// Invite a new user into the identity provider and return its subject
    async fn invite_user(&self, employee: &NewEmployee) -> Result<Subject>;
}
