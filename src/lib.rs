//! # Dyehouse
//!
//! Order tracking for a yarn-dyeing house: orders of yarn items move through
//! a fixed production pipeline, and edits after creation go through one-time
//! factory corrections or admin-approved change requests.
//!
//! ## Features
//!
//! - **Order lifecycle**: seven-stage pipeline per item with append-only status history
//! - **Role-scoped access**: sales, operator, factory and admin each see and edit what their role allows
//! - **Change requests**: pending, approved and used states, consumed exactly once by the edit they unlock
//! - **Field-level edit permissions**: resolved from role, order flags and the approved request
//! - **REST server**: axum router with bearer-token sessions under `/api`
//! - **HTTP client and board**: the same service traits over reqwest, plus a client-side board
//!   that keeps order and request state consistent across refreshes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dyehouse::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryStore::with_users(AppConfig::demo_users())?;
//!     ServerBuilder::new()
//!         .with_store(store)
//!         .with_cors()
//!         .serve("127.0.0.1:5000")
//!         .await
//! }
//! ```

pub mod board;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Domain ===
    pub use crate::core::{
        auth::{AuthContext, AuthProvider, BearerToken, Operation, Session},
        change_request::{ChangeRequest, ChangeRequestStatus, Decision, RequestState},
        draft::{ItemInput, OrderDraft, SlQuantity},
        error::{DyehouseError, ErrorKind, Result},
        order::{Order, OrderItem, StatusUpdate},
        permission::{EditPath, EditRoute, EditableFields, OrderField, OrderPatch},
        query::{ChangeRequestQuery, OrderFilter, OrderSummary},
        role::Role,
        service::{AuthService, Backend, ChangeRequestService, OrderService},
        status::Status,
        user::{LoginRequest, NewUser, User},
    };

    // === Board ===
    pub use crate::board::{BoardSnapshot, OrderBoard, RefreshOutcome, RequestOutcome};

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{ApiConfig, AppConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === Client ===
    #[cfg(feature = "client")]
    pub use crate::client::HttpBackend;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
