//! Collaborator traits for users, orders and change requests
//!
//! Two implementations exist: the in-memory store that owns the data and the
//! HTTP client that talks to a running server. Every call carries the caller's
//! [`Session`]; implementations resolve the authoritative identity from its
//! token and never trust the embedded user.

use crate::core::auth::Session;
use crate::core::change_request::{ChangeRequest, Decision};
use crate::core::draft::OrderDraft;
use crate::core::error::Result;
use crate::core::order::{Order, OrderItem, StatusUpdate};
use crate::core::permission::OrderPatch;
use crate::core::query::{ChangeRequestQuery, OrderFilter, OrderSummary};
use crate::core::status::Status;
use crate::core::user::{LoginRequest, NewUser, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Login and user management
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a session
    async fn login(&self, credentials: &LoginRequest) -> Result<Session>;

    /// Revoke the session's token; other sessions of the same user stay valid
    async fn logout(&self, session: &Session) -> Result<()>;

    /// The user behind the session's token
    async fn me(&self, session: &Session) -> Result<User>;

    /// Users with the sales role, for the salesperson picker
    async fn sales_users(&self, session: &Session) -> Result<Vec<User>>;

    async fn list_users(&self, session: &Session) -> Result<Vec<User>>;

    async fn create_user(&self, session: &Session, user: &NewUser) -> Result<User>;

    async fn delete_user(&self, session: &Session, id: &Uuid) -> Result<()>;
}

/// Orders and item status
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn list_orders(&self, session: &Session, filter: &OrderFilter) -> Result<Vec<Order>>;

    async fn get_order(&self, session: &Session, id: &Uuid) -> Result<Order>;

    /// Validate and persist a new order
    async fn create_order(&self, session: &Session, draft: &OrderDraft) -> Result<Order>;

    /// Apply an edit through the factory one-time path or an approved change
    /// request, marking the path used in the same step
    async fn update_order(&self, session: &Session, id: &Uuid, patch: &OrderPatch) -> Result<Order>;

    async fn delete_order(&self, session: &Session, id: &Uuid) -> Result<()>;

    /// Set an item's status, appending a history entry stamped by the backend
    async fn update_item_status(
        &self,
        session: &Session,
        item_id: &Uuid,
        status: Status,
    ) -> Result<OrderItem>;

    async fn item_history(&self, session: &Session, item_id: &Uuid) -> Result<Vec<StatusUpdate>>;

    async fn order_summary(&self, session: &Session, filter: &OrderFilter) -> Result<OrderSummary>;
}

/// The change-request workflow
#[async_trait]
pub trait ChangeRequestService: Send + Sync {
    /// Open a pending request; fails while another one is pending
    async fn request_change(&self, session: &Session, order_id: &Uuid) -> Result<ChangeRequest>;

    /// Admins see every request, everyone else only their own
    async fn list_change_requests(
        &self,
        session: &Session,
        query: &ChangeRequestQuery,
    ) -> Result<Vec<ChangeRequest>>;

    /// Approve or reject a pending request
    async fn process_change_request(
        &self,
        session: &Session,
        id: &Uuid,
        decision: Decision,
        note: Option<String>,
    ) -> Result<ChangeRequest>;

    /// Spend an approved request without an edit; at most once per request
    async fn mark_used(&self, session: &Session, id: &Uuid) -> Result<ChangeRequest>;
}

/// Everything the board needs from a backend
pub trait Backend: AuthService + OrderService + ChangeRequestService {}

impl<T> Backend for T where T: AuthService + OrderService + ChangeRequestService {}
