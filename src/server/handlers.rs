//! HTTP handlers
//!
//! Handlers only translate HTTP to store calls; every rule is enforced by the
//! store.

use crate::core::auth::Session;
use crate::core::change_request::ChangeRequest;
use crate::core::draft::OrderDraft;
use crate::core::error::Result;
use crate::core::order::{Order, OrderItem, StatusUpdate};
use crate::core::payload::{NewChangeRequest, ProcessDecision, StatusChange};
use crate::core::permission::OrderPatch;
use crate::core::query::{ChangeRequestQuery, OrderFilter, OrderSummary};
use crate::core::service::{AuthService, ChangeRequestService, OrderService};
use crate::core::status::Status;
use crate::core::user::{LoginRequest, NewUser, User};
use crate::server::extract::{ApiJson, ApiQuery, CurrentSession};
use crate::server::router::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(raw)?)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dyehouse"
    }))
}

// === Auth ===

pub async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<LoginRequest>,
) -> Result<Json<Session>> {
    Ok(Json(state.store.login(&credentials).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<StatusCode> {
    state.store.logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Json<User>> {
    Ok(Json(state.store.me(&session).await?))
}

pub async fn sales_users(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.sales_users(&session).await?))
}

// === Users ===

pub async fn list_users(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.list_users(&session).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(user): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.store.create_user(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_user(&session, &parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Orders ===

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.store.list_orders(&session, &filter).await?))
}

pub async fn order_summary(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> Result<Json<OrderSummary>> {
    Ok(Json(state.store.order_summary(&session, &filter).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(draft): ApiJson<OrderDraft>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.store.create_order(&session, &draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    Ok(Json(state.store.get_order(&session, &parse_id(&id)?).await?))
}

pub async fn update_order(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<OrderPatch>,
) -> Result<Json<Order>> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.update_order(&session, &id, &patch).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_order(&session, &parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn request_order_change(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ChangeRequest>)> {
    let request = state.store.request_change(&session, &parse_id(&id)?).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

// === Order items ===

pub async fn update_item_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<OrderItem>> {
    let id = parse_id(&id)?;
    let status: Status = change.status.parse()?;
    Ok(Json(state.store.update_item_status(&session, &id, status).await?))
}

pub async fn item_history(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusUpdate>>> {
    Ok(Json(state.store.item_history(&session, &parse_id(&id)?).await?))
}

// === Change requests ===

pub async fn list_change_requests(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiQuery(query): ApiQuery<ChangeRequestQuery>,
) -> Result<Json<Vec<ChangeRequest>>> {
    Ok(Json(state.store.list_change_requests(&session, &query).await?))
}

pub async fn create_change_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(body): ApiJson<NewChangeRequest>,
) -> Result<(StatusCode, Json<ChangeRequest>)> {
    let request = state.store.request_change(&session, &body.order_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn process_change_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProcessDecision>,
) -> Result<Json<ChangeRequest>> {
    let id = parse_id(&id)?;
    let request = state
        .store
        .process_change_request(&session, &id, body.status, body.admin_note)
        .await?;
    Ok(Json(request))
}

pub async fn mark_change_request_used(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<ChangeRequest>> {
    Ok(Json(state.store.mark_used(&session, &parse_id(&id)?).await?))
}
