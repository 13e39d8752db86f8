//! HTTP client implementing the collaborator traits against a running server
//!
//! Error bodies are turned back into typed errors with
//! [`DyehouseError::from_response`]; connection failures and timeouts become
//! `Transient`.

use crate::config::ApiConfig;
use crate::core::auth::Session;
use crate::core::change_request::{ChangeRequest, Decision};
use crate::core::draft::OrderDraft;
use crate::core::error::{DyehouseError, ErrorResponse, Result};
use crate::core::order::{Order, OrderItem, StatusUpdate};
use crate::core::payload::{NewChangeRequest, ProcessDecision, StatusChange};
use crate::core::permission::OrderPatch;
use crate::core::query::{ChangeRequestQuery, OrderFilter, OrderSummary};
use crate::core::service::{AuthService, ChangeRequestService, OrderService};
use crate::core::status::Status;
use crate::core::user::{LoginRequest, NewUser, User};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// Backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` includes the `/api` prefix, e.g. `http://localhost:5000/api`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DyehouseError::Config {
                message: format!("cannot build HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(api.base_url.clone(), api.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(session.token.expose())
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(transient)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ErrorResponse>().await.ok();
        let err = DyehouseError::from_response(status.as_u16(), body);
        tracing::debug!(status = status.as_u16(), code = err.error_code(), "request failed");
        Err(err)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.dispatch(builder).await?.json::<T>().await.map_err(transient)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.dispatch(builder).await.map(|_| ())
    }
}

fn transient(err: reqwest::Error) -> DyehouseError {
    DyehouseError::Transient {
        message: err.to_string(),
    }
}

#[async_trait]
impl AuthService for HttpBackend {
    async fn login(&self, credentials: &LoginRequest) -> Result<Session> {
        self.send(self.http.post(self.url("/auth/login")).json(credentials))
            .await
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        self.send_empty(self.authed(self.http.post(self.url("/auth/logout")), session))
            .await
    }

    async fn me(&self, session: &Session) -> Result<User> {
        self.send(self.authed(self.http.get(self.url("/auth/me")), session))
            .await
    }

    async fn sales_users(&self, session: &Session) -> Result<Vec<User>> {
        self.send(self.authed(self.http.get(self.url("/auth/sales-users")), session))
            .await
    }

    async fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        self.send(self.authed(self.http.get(self.url("/users")), session))
            .await
    }

    async fn create_user(&self, session: &Session, user: &NewUser) -> Result<User> {
        self.send(self.authed(self.http.post(self.url("/users")), session).json(user))
            .await
    }

    async fn delete_user(&self, session: &Session, id: &Uuid) -> Result<()> {
        let url = self.url(&format!("/users/{}", id));
        self.send_empty(self.authed(self.http.delete(url), session))
            .await
    }
}

#[async_trait]
impl OrderService for HttpBackend {
    async fn list_orders(&self, session: &Session, filter: &OrderFilter) -> Result<Vec<Order>> {
        let builder = self.authed(self.http.get(self.url("/orders")), session);
        self.send(builder.query(filter)).await
    }

    async fn get_order(&self, session: &Session, id: &Uuid) -> Result<Order> {
        let url = self.url(&format!("/orders/{}", id));
        self.send(self.authed(self.http.get(url), session)).await
    }

    async fn create_order(&self, session: &Session, draft: &OrderDraft) -> Result<Order> {
        self.send(self.authed(self.http.post(self.url("/orders")), session).json(draft))
            .await
    }

    async fn update_order(&self, session: &Session, id: &Uuid, patch: &OrderPatch) -> Result<Order> {
        let url = self.url(&format!("/orders/{}", id));
        self.send(self.authed(self.http.patch(url), session).json(patch))
            .await
    }

    async fn delete_order(&self, session: &Session, id: &Uuid) -> Result<()> {
        let url = self.url(&format!("/orders/{}", id));
        self.send_empty(self.authed(self.http.delete(url), session))
            .await
    }

    async fn update_item_status(
        &self,
        session: &Session,
        item_id: &Uuid,
        status: Status,
    ) -> Result<OrderItem> {
        let url = self.url(&format!("/order-items/{}/status", item_id));
        let body = StatusChange {
            status: status.as_str().to_string(),
        };
        self.send(self.authed(self.http.put(url), session).json(&body))
            .await
    }

    async fn item_history(&self, session: &Session, item_id: &Uuid) -> Result<Vec<StatusUpdate>> {
        let url = self.url(&format!("/order-items/{}/history", item_id));
        self.send(self.authed(self.http.get(url), session)).await
    }

    async fn order_summary(&self, session: &Session, filter: &OrderFilter) -> Result<OrderSummary> {
        let builder = self.authed(self.http.get(self.url("/orders/summary")), session);
        self.send(builder.query(filter)).await
    }
}

#[async_trait]
impl ChangeRequestService for HttpBackend {
    async fn request_change(&self, session: &Session, order_id: &Uuid) -> Result<ChangeRequest> {
        let body = NewChangeRequest { order_id: *order_id };
        self.send(
            self.authed(self.http.post(self.url("/change-requests")), session)
                .json(&body),
        )
        .await
    }

    async fn list_change_requests(
        &self,
        session: &Session,
        query: &ChangeRequestQuery,
    ) -> Result<Vec<ChangeRequest>> {
        let builder = self.authed(self.http.get(self.url("/change-requests")), session);
        self.send(builder.query(query)).await
    }

    async fn process_change_request(
        &self,
        session: &Session,
        id: &Uuid,
        decision: Decision,
        note: Option<String>,
    ) -> Result<ChangeRequest> {
        let url = self.url(&format!("/change-requests/{}/process", id));
        let body = ProcessDecision {
            status: decision,
            admin_note: note,
        };
        self.send(self.authed(self.http.patch(url), session).json(&body))
            .await
    }

    async fn mark_used(&self, session: &Session, id: &Uuid) -> Result<ChangeRequest> {
        let url = self.url(&format!("/change-requests/{}/mark-used", id));
        self.send(self.authed(self.http.patch(url), session)).await
    }
}
