use crate::common::ActionError;
use crate::domains::policy::{PolicyRule, RoleAssignment};

/// Policy resource guarding the permissions actions themselves
pub const RESOURCE: &str = "permissions";

pub const ACTION_READ: &str = "read";
pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";

fn validate_field(name: &str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::invalid(format!("{name} must not be empty")));
    }
    if value != value.trim() || value.contains(',') {
        return Err(ActionError::invalid(format!(
            "{name} must not contain commas or surrounding whitespace"
        )));
    }
    Ok(())
}

pub fn validate_rule(rule: &PolicyRule) -> Result<(), ActionError> {
    validate_field("subject", &rule.subject)?;
    validate_field("resource", &rule.resource)?;
    validate_field("action", &rule.action)
}

pub fn validate_assignment(assignment: &RoleAssignment) -> Result<(), ActionError> {
    validate_field("subject", &assignment.subject)?;
    validate_field("role", &assignment.role)?;
    if assignment.subject == assignment.role {
        return Err(ActionError::invalid("a subject cannot be assigned to itself"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rule() {
        assert!(validate_rule(&PolicyRule::allow("manager", "bids", "create")).is_ok());
        assert!(validate_rule(&PolicyRule::allow("", "bids", "create")).is_err());
        assert!(validate_rule(&PolicyRule::allow("manager", "bids, contracts", "create")).is_err());
        assert!(validate_rule(&PolicyRule::allow("manager", " bids", "create")).is_err());
    }

    #[test]
    fn test_validate_assignment() {
        assert!(validate_assignment(&RoleAssignment::new("user-1", "manager")).is_ok());
        assert!(validate_assignment(&RoleAssignment::new("manager", "manager")).is_err());
        assert!(validate_assignment(&RoleAssignment::new("user-1", "")).is_err());
    }
}
