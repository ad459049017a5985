use serde::{Deserialize, Serialize};
use std::fmt;

/// Effect of a matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single access rule: `subject` may be a subject id or a role name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub effect: Effect,
}

impl PolicyRule {
    pub fn allow(subject: &str, resource: &str, action: &str) -> Self {
        Self {
            subject: subject.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            effect: Effect::Allow,
        }
    }

    pub fn deny(subject: &str, resource: &str, action: &str) -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow(subject, resource, action)
        }
    }

    /// Field order expected by the `p` policy definition
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.resource.clone(),
            self.action.clone(),
            self.effect.as_str().to_string(),
        ]
    }

    /// Rebuild a rule from stored `p` fields. Rows without an effect column
    /// are treated as allow rules.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        let [subject, resource, action, rest @ ..] = fields else {
            return None;
        };
        let effect = match rest.first().map(String::as_str) {
            None | Some("") => Effect::Allow,
            Some(raw) => Effect::parse(raw)?,
        };
        Some(Self {
            subject: subject.clone(),
            resource: resource.clone(),
            action: action.clone(),
            effect,
        })
    }
}

/// Subject -> role link (`g` rule)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub subject: String,
    pub role: String,
}

impl RoleAssignment {
    pub fn new(subject: &str, role: &str) -> Self {
        Self {
            subject: subject.to_string(),
            role: role.to_string(),
        }
    }

    pub fn to_fields(&self) -> Vec<String> {
        vec![self.subject.clone(), self.role.clone()]
    }
}

/// Everything loaded from the policy store in one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub rules: Vec<PolicyRule>,
    pub assignments: Vec<RoleAssignment>,
}

impl PolicySet {
    pub fn new(rules: Vec<PolicyRule>, assignments: Vec<RoleAssignment>) -> Self {
        Self { rules, assignments }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_fields_defaults_to_allow() {
        let rule = PolicyRule::from_fields(&fields(&["manager", "employees", "create"])).unwrap();
        assert_eq!(rule, PolicyRule::allow("manager", "employees", "create"));

        let rule =
            PolicyRule::from_fields(&fields(&["manager", "employees", "create", ""])).unwrap();
        assert_eq!(rule.effect, Effect::Allow);
    }

    #[test]
    fn test_from_fields_rejects_malformed_rows() {
        assert!(PolicyRule::from_fields(&fields(&["manager", "employees"])).is_none());
        assert!(PolicyRule::from_fields(&fields(&["a", "b", "c", "maybe"])).is_none());
    }

    #[test]
    fn test_deny_rule_fields() {
        let rule = PolicyRule::deny("user", "permissions", "delete");
        assert_eq!(rule.to_fields(), fields(&["user", "permissions", "delete", "deny"]));
    }

    #[test]
    fn test_effect_deserializes_missing_as_allow() {
        let rule: PolicyRule = serde_json::from_str(
            r#"{"subject":"admin","resource":"contracts","action":"update"}"#,
        )
        .unwrap();
        assert_eq!(rule.effect, Effect::Allow);
    }
}
