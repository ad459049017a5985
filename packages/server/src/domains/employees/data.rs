use serde::{Deserialize, Serialize};

use crate::common::{ActionError, Role};

pub const RESOURCE: &str = "employees";

/// Input for inviting a new employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), ActionError> {
        if self.name.trim().is_empty() {
            return Err(ActionError::invalid("name must not be empty"));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(ActionError::invalid("email is not valid")),
        }
    }
}
