//! Core domain: orders, statuses, change requests and the rules that bind them

pub mod auth;
pub mod change_request;
pub mod draft;
pub mod error;
pub mod order;
pub mod payload;
pub mod permission;
pub mod query;
pub mod role;
pub mod service;
pub mod status;
pub mod user;
pub mod validation;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, BearerToken, Operation, Session};
pub use change_request::{ChangeRequest, ChangeRequestStatus, Decision, RequestState};
pub use draft::{ItemInput, OrderDraft, SlQuantity};
pub use error::{DyehouseError, ErrorKind, ErrorResponse, FieldError, Result};
pub use order::{Order, OrderHeader, OrderItem, StatusUpdate};
pub use permission::{EditPath, EditRoute, EditableFields, OrderField, OrderPatch};
pub use query::{ChangeRequestQuery, OrderFilter, OrderSummary, StatusCount};
pub use role::Role;
pub use service::{AuthService, Backend, ChangeRequestService, OrderService};
pub use status::{ColorTag, Status};
pub use user::{LoginRequest, NewUser, User, UserSummary};
