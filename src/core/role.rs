//! User roles

use crate::core::error::DyehouseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a dashboard user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sales,
    Operator,
    Factory,
    Admin,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Sales, Role::Operator, Role::Factory, Role::Admin]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sales => "sales",
            Role::Operator => "operator",
            Role::Factory => "factory",
            Role::Admin => "admin",
        }
    }

    /// Roles that may ask an admin to reopen an order for editing
    pub fn can_request_changes(&self) -> bool {
        matches!(self, Role::Factory | Role::Operator)
    }

    /// Roles that must pick a salesperson when they place an order
    pub fn assigns_salesperson(&self) -> bool {
        matches!(self, Role::Admin | Role::Operator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DyehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DyehouseError::BadRequest {
                message: format!("unknown role '{}'", s),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        assert_eq!("factory".parse::<Role>().unwrap(), Role::Factory);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_change_request_roles() {
        assert!(Role::Factory.can_request_changes());
        assert!(Role::Operator.can_request_changes());
        assert!(!Role::Admin.can_request_changes());
        assert!(!Role::Sales.can_request_changes());
    }
}
