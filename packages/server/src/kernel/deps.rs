//! Server dependencies (using traits for testability)
//!
//! Central dependency container handed to the request gate, the routes, and
//! the domain actions. Every external service sits behind a trait so tests
//! can inject the in-process fakes from `test_dependencies`.

use std::sync::Arc;

use crate::domains::policy::PolicyEnforcer;
use crate::kernel::{BaseAuthAdmin, BaseAuthProvider, BasePolicyStore};

#[derive(Clone)]
pub struct ServerDeps {
    /// Shared policy decisions; also owns the policy store handle
    pub enforcer: Arc<PolicyEnforcer>,
    /// Session validation, login and logout (public key only)
    pub auth: Arc<dyn BaseAuthProvider>,
    /// Elevated identity operations (service-role key)
    pub auth_admin: Arc<dyn BaseAuthAdmin>,
    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,
}

impl ServerDeps {
    pub fn new(
        enforcer: Arc<PolicyEnforcer>,
        auth: Arc<dyn BaseAuthProvider>,
        auth_admin: Arc<dyn BaseAuthAdmin>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            enforcer,
            auth,
            auth_admin,
            cookie_secure,
        }
    }

    pub fn policy_store(&self) -> &Arc<dyn BasePolicyStore> {
        self.enforcer.store()
    }
}
