//! Policy domain - declarative access rules and their enforcement
//!
//! Responsibilities:
//! - Embedded policy model (subject/resource/action with role links)
//! - Rule and role-assignment records shared with the policy store
//! - The shared `PolicyEnforcer` and its single-flight initialization

pub mod cell;
pub mod enforcer;
pub mod model;
pub mod rules;

pub use cell::{global_enforcer, initialize, teardown, EnforcerCell};
pub use enforcer::{build_enforcer, PolicyEnforcer, PolicyStats};
pub use model::{model_conf, policy_model};
pub use rules::{Effect, PolicyRule, PolicySet, RoleAssignment};
