//! In-memory backend for development and tests
//!
//! All state sits behind one `RwLock`. Every transition takes the write lock
//! once, so checks and writes of a single call never interleave with another
//! call: an edit and the consumption of its change request land together, and
//! two racing consumers of the same request cannot both succeed.

use crate::core::auth::{AuthContext, AuthProvider, BearerToken, Operation, Session, authorize};
use crate::core::change_request::{self, ChangeRequest, Decision};
use crate::core::draft::{self, OrderDraft};
use crate::core::error::{DyehouseError, Result};
use crate::core::order::{Order, OrderItem, StatusUpdate};
use crate::core::permission::{self, EditPath, OrderPatch};
use crate::core::query::{ChangeRequestQuery, OrderFilter, OrderSummary};
use crate::core::role::Role;
use crate::core::service::{AuthService, ChangeRequestService, OrderService};
use crate::core::status::Status;
use crate::core::user::{LoginRequest, NewUser, User, UserSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

struct Account {
    user: User,
    password_digest: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    tokens: HashMap<BearerToken, Uuid>,
    orders: HashMap<Uuid, Order>,
    requests: HashMap<Uuid, ChangeRequest>,
}

impl State {
    fn context(&self, token: &BearerToken) -> Result<AuthContext> {
        self.tokens
            .get(token)
            .and_then(|id| self.accounts.get(id))
            .map(|account| AuthContext::from(&account.user))
            .ok_or_else(|| DyehouseError::not_authenticated("unknown or expired token"))
    }

    fn order(&self, id: &Uuid) -> Result<&Order> {
        self.orders
            .get(id)
            .ok_or_else(|| DyehouseError::not_found("order", id))
    }

    fn order_of_item(&self, item_id: &Uuid) -> Result<&Order> {
        self.orders
            .values()
            .find(|o| o.has_item(item_id))
            .ok_or_else(|| DyehouseError::not_found("order item", item_id))
    }

    fn salesperson(&self, id: &Uuid) -> Result<UserSummary> {
        self.accounts
            .get(id)
            .filter(|a| a.user.role == Role::Sales)
            .map(|a| UserSummary::from(&a.user))
            .ok_or_else(|| DyehouseError::field("salespersonId", "Salesperson is not a sales user"))
    }

    fn visible_to(ctx: &AuthContext, order: &Order) -> bool {
        ctx.role != Role::Sales || order.salesperson_id == Some(ctx.user_id)
    }
}

/// Backend keeping users, orders and change requests in memory
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    clock: fn() -> DateTime<Utc>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock: Utc::now,
        }
    }

    /// Create a store seeded with `users`
    pub fn with_users<I>(users: I) -> Result<Self>
    where
        I: IntoIterator<Item = NewUser>,
    {
        let store = Self::new();
        for user in users {
            store.register(&user)?;
        }
        Ok(store)
    }

    /// Replace the clock, for tests that need a fixed "today"
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Add a user without an admin session
    pub fn register(&self, new_user: &NewUser) -> Result<User> {
        new_user.check()?;
        let mut state = self.write()?;

        if state
            .accounts
            .values()
            .any(|a| a.user.username.eq_ignore_ascii_case(&new_user.username))
        {
            return Err(DyehouseError::field("username", "Username is already taken"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            name: new_user.name.clone(),
            role: new_user.role,
            email: new_user.email.clone(),
            department: new_user.department.clone(),
        };
        state.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_digest: digest(&new_user.username, &new_user.password),
            },
        );
        tracing::debug!(username = %user.username, role = %user.role, "registered user");
        Ok(user)
    }

    /// Resolve a bearer token into a session
    pub fn session(&self, token: &BearerToken) -> Result<Session> {
        let state = self.read()?;
        let user_id = state
            .tokens
            .get(token)
            .ok_or_else(|| DyehouseError::not_authenticated("unknown or expired token"))?;
        let account = state
            .accounts
            .get(user_id)
            .ok_or_else(|| DyehouseError::not_authenticated("user no longer exists"))?;
        Ok(Session::new(token.clone(), account.user.clone()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| DyehouseError::Internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| DyehouseError::Internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl AuthProvider for InMemoryStore {
    async fn authenticate(&self, token: &BearerToken) -> Result<AuthContext> {
        self.read()?.context(token)
    }
}

#[async_trait]
impl AuthService for InMemoryStore {
    async fn login(&self, credentials: &LoginRequest) -> Result<Session> {
        let mut state = self.write()?;
        let expected = digest(&credentials.username, &credentials.password);

        let user = state
            .accounts
            .values()
            .find(|a| {
                a.user.username.eq_ignore_ascii_case(credentials.username.trim())
                    && a.password_digest == expected
            })
            .map(|a| a.user.clone())
            .ok_or_else(|| {
                tracing::warn!(username = %credentials.username, "login rejected");
                DyehouseError::not_authenticated("invalid username or password")
            })?;

        let token = BearerToken::generate();
        state.tokens.insert(token.clone(), user.id);
        tracing::info!(username = %user.username, role = %user.role, "user logged in");
        Ok(Session::new(token, user))
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        let mut state = self.write()?;
        let user_id = state
            .tokens
            .remove(&session.token)
            .ok_or_else(|| DyehouseError::not_authenticated("unknown or expired token"))?;
        tracing::info!(%user_id, "user logged out");
        Ok(())
    }

    async fn me(&self, session: &Session) -> Result<User> {
        let state = self.read()?;
        let ctx = state.context(&session.token)?;
        state
            .accounts
            .get(&ctx.user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| DyehouseError::not_found("user", ctx.user_id))
    }

    async fn sales_users(&self, session: &Session) -> Result<Vec<User>> {
        let state = self.read()?;
        state.context(&session.token)?;

        let mut users: Vec<User> = state
            .accounts
            .values()
            .filter(|a| a.user.role == Role::Sales)
            .map(|a| a.user.clone())
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        let state = self.read()?;
        authorize(&state.context(&session.token)?, Operation::ManageUsers)?;

        let mut users: Vec<User> = state.accounts.values().map(|a| a.user.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, session: &Session, user: &NewUser) -> Result<User> {
        authorize(&self.authenticate(&session.token).await?, Operation::ManageUsers)?;
        self.register(user)
    }

    async fn delete_user(&self, session: &Session, id: &Uuid) -> Result<()> {
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ManageUsers)?;

        if &ctx.user_id == id {
            return Err(DyehouseError::BadRequest {
                message: "you cannot delete your own account".to_string(),
            });
        }
        let account = state
            .accounts
            .remove(id)
            .ok_or_else(|| DyehouseError::not_found("user", id))?;
        state.tokens.retain(|_, user_id| user_id != id);

        tracing::info!(username = %account.user.username, "deleted user");
        Ok(())
    }
}

#[async_trait]
impl OrderService for InMemoryStore {
    async fn list_orders(&self, session: &Session, filter: &OrderFilter) -> Result<Vec<Order>> {
        let state = self.read()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ViewOrders)?;

        let mut orders = filter.apply(
            state
                .orders
                .values()
                .filter(|o| State::visible_to(&ctx, o)),
        );
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn get_order(&self, session: &Session, id: &Uuid) -> Result<Order> {
        let state = self.read()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ViewOrders)?;

        let order = state.order(id)?;
        if !State::visible_to(&ctx, order) {
            return Err(DyehouseError::not_found("order", id));
        }
        Ok(order.clone())
    }

    async fn create_order(&self, session: &Session, draft: &OrderDraft) -> Result<Order> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::CreateOrder)?;

        let mut order = draft::create_order(draft, &ctx, now.date_naive(), now)?;
        order.salesperson = match &order.salesperson_id {
            Some(id) => Some(state.salesperson(id)?),
            None => None,
        };

        tracing::info!(
            order_id = %order.id,
            sdy_number = %order.sdy_number,
            items = order.items().len(),
            by = %ctx.username,
            "order created"
        );
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, session: &Session, id: &Uuid, patch: &OrderPatch) -> Result<Order> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        if !ctx.role.can_request_changes() {
            return Err(DyehouseError::not_authorized(format!("{} may not edit orders", ctx.role)));
        }

        let mut order = state.order(id)?.clone();

        let active = match patch.change_request_id {
            Some(request_id) => {
                let request = state
                    .requests
                    .get(&request_id)
                    .filter(|r| r.order_id == order.id && r.requester_id == ctx.user_id)
                    .ok_or_else(|| DyehouseError::not_found("change request", request_id))?;
                Some(request)
            }
            None => change_request::first_unused_approved(state.requests.values(), order.id, ctx.user_id),
        };

        let editable = permission::resolve_editable_fields(ctx.role, &order, active);
        if editable.path == EditPath::Locked {
            return Err(DyehouseError::NoUnusedApprovedRequest { order_id: order.id });
        }
        permission::check_patch(&editable, patch)?;

        let salesperson = match &patch.salesperson_id {
            Some(sid) => Some(state.salesperson(sid)?),
            None => None,
        };
        permission::apply_patch(&mut order, patch, ctx.user_id, now)?;
        if salesperson.is_some() {
            order.salesperson = salesperson;
        }

        match editable.path {
            EditPath::FactoryOneTime => order.factory_one_time_edit_used = true,
            EditPath::ChangeRequest(request_id) => {
                let request = state
                    .requests
                    .get_mut(&request_id)
                    .ok_or_else(|| DyehouseError::not_found("change request", request_id))?;
                request.consume(&ctx, now)?;
            }
            EditPath::Locked => {}
        }

        tracing::info!(
            order_id = %order.id,
            path = ?editable.path,
            fields = ?patch.touched_fields(),
            by = %ctx.username,
            "order edited"
        );
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn delete_order(&self, session: &Session, id: &Uuid) -> Result<()> {
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::DeleteOrder)?;

        state
            .orders
            .remove(id)
            .ok_or_else(|| DyehouseError::not_found("order", id))?;
        state.requests.retain(|_, r| &r.order_id != id);

        tracing::info!(order_id = %id, by = %ctx.username, "order deleted");
        Ok(())
    }

    async fn update_item_status(
        &self,
        session: &Session,
        item_id: &Uuid,
        status: Status,
    ) -> Result<OrderItem> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ChangeItemStatus)?;

        let order_id = state.order_of_item(item_id)?.id;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DyehouseError::not_found("order", order_id))?;
        let item = order.set_item_status(item_id, status, ctx.user_id, now)?.clone();

        tracing::info!(order_id = %order_id, item_id = %item_id, status = %status, by = %ctx.username, "item status changed");
        Ok(item)
    }

    async fn item_history(&self, session: &Session, item_id: &Uuid) -> Result<Vec<StatusUpdate>> {
        let state = self.read()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ViewOrders)?;

        let order = state.order_of_item(item_id)?;
        if !State::visible_to(&ctx, order) {
            return Err(DyehouseError::not_found("order item", item_id));
        }
        Ok(order
            .item(item_id)
            .map(|i| i.history().to_vec())
            .unwrap_or_default())
    }

    async fn order_summary(&self, session: &Session, filter: &OrderFilter) -> Result<OrderSummary> {
        let orders = self.list_orders(session, filter).await?;
        Ok(OrderSummary::from_orders(&orders))
    }
}

#[async_trait]
impl ChangeRequestService for InMemoryStore {
    async fn request_change(&self, session: &Session, order_id: &Uuid) -> Result<ChangeRequest> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;

        let request = ChangeRequest::open(*order_id, &ctx, now)?;
        state.order(order_id)?;
        change_request::ensure_no_pending(state.requests.values(), *order_id)?;

        tracing::info!(request_id = %request.id, order_id = %order_id, by = %ctx.username, "change requested");
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn list_change_requests(
        &self,
        session: &Session,
        query: &ChangeRequestQuery,
    ) -> Result<Vec<ChangeRequest>> {
        let state = self.read()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ViewChangeRequests)?;

        let mut requests: Vec<ChangeRequest> = state
            .requests
            .values()
            .filter(|r| ctx.role == Role::Admin || r.requester_id == ctx.user_id)
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn process_change_request(
        &self,
        session: &Session,
        id: &Uuid,
        decision: Decision,
        note: Option<String>,
    ) -> Result<ChangeRequest> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;
        authorize(&ctx, Operation::ProcessChangeRequest)?;

        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| DyehouseError::not_found("change request", id))?;
        request.decide(&ctx, decision, note, now)?;

        tracing::info!(request_id = %id, status = %request.status, by = %ctx.username, "change request processed");
        Ok(request.clone())
    }

    async fn mark_used(&self, session: &Session, id: &Uuid) -> Result<ChangeRequest> {
        let now = self.now();
        let mut state = self.write()?;
        let ctx = state.context(&session.token)?;

        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| DyehouseError::not_found("change request", id))?;
        request.consume(&ctx, now)?;

        tracing::info!(request_id = %id, by = %ctx.username, "change request used");
        Ok(request.clone())
    }
}
