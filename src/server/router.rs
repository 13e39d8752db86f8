//! Route table

use crate::server::handlers;
use crate::storage::InMemoryStore;
use axum::Router;
use axum::routing::{get, patch, post, put};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: InMemoryStore,
}

/// Build the API routes, all relative to the `/api` prefix
///
/// - POST /auth/login, POST /auth/logout, GET /auth/me, GET /auth/sales-users
/// - GET|POST /users, DELETE /users/{id}
/// - GET|POST /orders, GET /orders/summary
/// - GET|PATCH|DELETE /orders/{id}, POST /orders/{id}/request-change
/// - PUT /order-items/{id}/status, GET /order-items/{id}/history
/// - GET|POST /change-requests
/// - PATCH /change-requests/{id}/process, PATCH /change-requests/{id}/mark-used
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route("/auth/sales-users", get(handlers::sales_users))
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/{id}", axum::routing::delete(handlers::delete_user))
        .route("/orders", get(handlers::list_orders).post(handlers::create_order))
        .route("/orders/summary", get(handlers::order_summary))
        .route(
            "/orders/{id}",
            get(handlers::get_order)
                .patch(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .route("/orders/{id}/request-change", post(handlers::request_order_change))
        .route("/order-items/{id}/status", put(handlers::update_item_status))
        .route("/order-items/{id}/history", get(handlers::item_history))
        .route(
            "/change-requests",
            get(handlers::list_change_requests).post(handlers::create_change_request),
        )
        .route("/change-requests/{id}/process", patch(handlers::process_change_request))
        .route("/change-requests/{id}/mark-used", patch(handlers::mark_change_request_used))
        .with_state(state)
}
