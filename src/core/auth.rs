//! Authentication context and role-based access policy
//!
//! Access rules live in one table, [`Operation::policy`], consulted once per
//! operation. The bearer credential travels in an explicit [`Session`] that is
//! passed to every collaborator call.

use crate::core::error::{DyehouseError, Result};
use crate::core::role::Role;
use crate::core::user::User;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque bearer credential
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Fresh random token
    pub fn generate() -> Self {
        Self(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
    }

    /// Parse an `Authorization` header value
    pub fn from_header(value: &str) -> Option<Self> {
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// A logged-in user together with the credential to present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: BearerToken,
    pub user: User,
}

impl Session {
    pub fn new(token: BearerToken, user: User) -> Self {
        Self { token, user }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

/// Identity of the caller after the credential has been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<Role>),

    /// Admin only
    AdminOnly,
}

impl AuthPolicy {
    /// Check if the caller satisfies this policy (`None` is anonymous)
    pub fn check(&self, context: Option<&AuthContext>) -> bool {
        match self {
            AuthPolicy::Authenticated => context.is_some(),
            AuthPolicy::HasRole(roles) => context.is_some_and(|c| roles.contains(&c.role)),
            AuthPolicy::AdminOnly => context.is_some_and(|c| c.role == Role::Admin),
        }
    }
}

/// Everything a caller can ask the backend to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewOrders,
    CreateOrder,
    ChangeItemStatus,
    RequestChange,
    ProcessChangeRequest,
    ViewChangeRequests,
    DeleteOrder,
    ManageUsers,
}

impl Operation {
    /// The access policy table
    pub fn policy(&self) -> AuthPolicy {
        match self {
            Operation::ViewOrders => AuthPolicy::Authenticated,
            Operation::CreateOrder => AuthPolicy::HasRole(vec![Role::Operator]),
            Operation::ChangeItemStatus => AuthPolicy::HasRole(vec![Role::Operator]),
            Operation::RequestChange => AuthPolicy::HasRole(vec![Role::Factory, Role::Operator]),
            Operation::ProcessChangeRequest => AuthPolicy::AdminOnly,
            Operation::ViewChangeRequests => {
                AuthPolicy::HasRole(vec![Role::Admin, Role::Factory, Role::Operator])
            }
            Operation::DeleteOrder => AuthPolicy::AdminOnly,
            Operation::ManageUsers => AuthPolicy::AdminOnly,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Operation::ViewOrders => "view orders",
            Operation::CreateOrder => "add orders",
            Operation::ChangeItemStatus => "change item status",
            Operation::RequestChange => "request changes",
            Operation::ProcessChangeRequest => "process change requests",
            Operation::ViewChangeRequests => "view change requests",
            Operation::DeleteOrder => "delete orders",
            Operation::ManageUsers => "manage users",
        }
    }

    pub fn permits(&self, context: &AuthContext) -> bool {
        self.policy().check(Some(context))
    }
}

/// Fail with `NotAuthorized` unless the caller may perform `operation`
pub fn authorize(context: &AuthContext, operation: Operation) -> Result<()> {
    if operation.permits(context) {
        Ok(())
    } else {
        Err(DyehouseError::not_authorized(format!(
            "{} may not {}",
            context.role,
            operation.describe()
        )))
    }
}

/// Resolves a bearer credential to the caller's identity
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Fails with `NotAuthenticated` for unknown or revoked tokens
    async fn authenticate(&self, token: &BearerToken) -> Result<AuthContext>;
}
