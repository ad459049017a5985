// Business domains
//
// policy      - policy model, rules, and the shared enforcer
// permissions - guarded administration of the policy set
// employees   - staff onboarding with role assignment

pub mod employees;
pub mod permissions;
pub mod policy;
