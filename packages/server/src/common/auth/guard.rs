use std::convert::Infallible;
use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{AuthError, Subject};
use crate::domains::policy::PolicyEnforcer;
use crate::kernel::ServerDeps;

/// Subject resolved for the current request by the session gate.
///
/// Extracting it never fails; `None` means the request is anonymous.
#[derive(Clone, Debug, Default)]
pub struct CurrentSubject(pub Option<Subject>);

impl CurrentSubject {
    pub fn subject(&self) -> Option<&Subject> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSubject
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentSubject>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Successful permission check.
///
/// Carries the enforcer so follow-up checks in the same operation see the
/// same policy.
#[derive(Clone)]
pub struct Permit {
    pub subject: Subject,
    pub enforcer: Arc<PolicyEnforcer>,
}

impl Permit {
    /// Follow-up check for the same subject
    pub fn can(&self, resource: &str, action: &str) -> bool {
        self.enforcer
            .enforce(&self.subject.policy_id(), resource, action)
    }
}

/// Anything that can hand out the shared enforcer
pub trait HasEnforcer {
    fn enforcer(&self) -> &Arc<PolicyEnforcer>;
}

impl HasEnforcer for Arc<PolicyEnforcer> {
    fn enforcer(&self) -> &Arc<PolicyEnforcer> {
        self
    }
}

impl HasEnforcer for ServerDeps {
    fn enforcer(&self) -> &Arc<PolicyEnforcer> {
        &self.enforcer
    }
}

/// Entry point for authorization checks
///
/// Usage:
/// ```ignore
/// let permit = Actor::new(session.subject())
///     .can("employees", "create")
///     .check(deps)?;
/// ```
pub struct Actor<'a> {
    subject: Option<&'a Subject>,
}

impl<'a> Actor<'a> {
    pub fn new(subject: Option<&'a Subject>) -> Self {
        Self { subject }
    }

    /// Specify what the actor wants to do
    pub fn can(self, resource: &'a str, action: &'a str) -> PermissionCheck<'a> {
        PermissionCheck {
            subject: self.subject,
            resource,
            action,
        }
    }
}

/// Builder after specifying resource and action
pub struct PermissionCheck<'a> {
    subject: Option<&'a Subject>,
    resource: &'a str,
    action: &'a str,
}

impl PermissionCheck<'_> {
    /// Perform the check. Authentication is verified before authorization.
    pub fn check<D>(self, deps: &D) -> Result<Permit, AuthError>
    where
        D: HasEnforcer,
    {
        let Some(subject) = self.subject else {
            tracing::debug!(
                resource = self.resource,
                action = self.action,
                "Permission check without a session"
            );
            return Err(AuthError::NotAuthenticated);
        };

        let enforcer = deps.enforcer();
        if !enforcer.enforce(&subject.policy_id(), self.resource, self.action) {
            tracing::warn!(
                subject_id = %subject.id,
                role = %subject.role,
                resource = self.resource,
                action = self.action,
                "Permission denied"
            );
            return Err(AuthError::not_authorized(self.resource, self.action));
        }

        Ok(Permit {
            subject: subject.clone(),
            enforcer: enforcer.clone(),
        })
    }
}

/// Resolve the session's subject and check it against the policy.
///
/// Call this before any state change; on `Err` nothing may be written.
pub fn check_permission<D>(
    session: &CurrentSubject,
    deps: &D,
    resource: &str,
    action: &str,
) -> Result<Permit, AuthError>
where
    D: HasEnforcer,
{
    Actor::new(session.subject())
        .can(resource, action)
        .check(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::auth::Role;
    use crate::domains::policy::{PolicyRule, PolicySet, RoleAssignment};
    use crate::kernel::MemoryPolicyStore;
    use uuid::Uuid;

    fn manager() -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: "Maria Gestora".to_string(),
            email: "maria@prefeitura.gov.br".to_string(),
            role: Role::Manager,
        }
    }

    async fn enforcer_for(subject: &Subject) -> Arc<PolicyEnforcer> {
        let policy = PolicySet::new(
            vec![PolicyRule::allow("manager", "employees", "create")],
            vec![RoleAssignment::new(&subject.policy_id(), "manager")],
        );
        let store = Arc::new(MemoryPolicyStore::with_policy(policy));
        Arc::new(PolicyEnforcer::initialize(store).await.unwrap())
    }

    #[tokio::test]
    async fn test_manager_can_create_employees() {
        let subject = manager();
        let enforcer = enforcer_for(&subject).await;
        let session = CurrentSubject(Some(subject.clone()));

        let permit = check_permission(&session, &enforcer, "employees", "create").unwrap();
        assert_eq!(permit.subject, subject);
        assert!(Arc::ptr_eq(&permit.enforcer, &enforcer));
    }

    #[tokio::test]
    async fn test_manager_cannot_delete_permissions() {
        let subject = manager();
        let enforcer = enforcer_for(&subject).await;
        let session = CurrentSubject(Some(subject));

        let mut mutated = false;
        let result = check_permission(&session, &enforcer, "permissions", "delete").map(|_| {
            mutated = true;
        });

        match result {
            Err(AuthError::NotAuthorized { resource, action }) => {
                assert_eq!(resource, "permissions");
                assert_eq!(action, "delete");
            }
            other => panic!("expected NotAuthorized, got {:?}", other.err()),
        }
        assert!(!mutated);
    }

    #[tokio::test]
    async fn test_anonymous_is_not_authenticated() {
        let subject = manager();
        let enforcer = enforcer_for(&subject).await;

        let result = check_permission(&CurrentSubject(None), &enforcer, "employees", "create");
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_role_field_alone_grants_nothing() {
        // Role claims only count through stored assignments
        let enforcer = enforcer_for(&manager()).await;
        let other_manager = CurrentSubject(Some(manager()));

        let result = check_permission(&other_manager, &enforcer, "employees", "create");
        assert!(matches!(result, Err(AuthError::NotAuthorized { .. })));
    }

    #[tokio::test]
    async fn test_permit_follow_up_checks() {
        let subject = manager();
        let enforcer = enforcer_for(&subject).await;
        let permit = Actor::new(Some(&subject))
            .can("employees", "create")
            .check(&enforcer)
            .unwrap();

        assert!(permit.can("employees", "create"));
        assert!(!permit.can("employees", "delete"));
    }
}
