//! Typed error handling for dyehouse
//!
//! Every fallible operation in the crate returns a [`DyehouseError`]. Errors
//! are grouped into an [`ErrorKind`] so callers can decide where to recover:
//!
//! - [`ErrorKind::Validation`]: detected before any network call, the form
//!   blocks submission and annotates the offending field
//! - [`ErrorKind::StateConflict`]: the backend refused a transition (request no
//!   longer pending, already used, duplicate pending request); refresh local
//!   change-request state afterwards
//! - [`ErrorKind::NotAuthenticated`]: missing or rejected bearer credential
//! - [`ErrorKind::NotAuthorized`]: role policy violation, never retried
//! - [`ErrorKind::Transient`]: network failure or unstructured error response
//!
//! The same type crosses the HTTP boundary: the server renders it through
//! [`IntoResponse`] and the client rebuilds it with
//! [`DyehouseError::from_response`].
//!
//! # Example
//!
//! ```rust,ignore
//! match backend.request_change(&session, order_id).await {
//!     Ok(request) => println!("requested: {}", request.id),
//!     Err(DyehouseError::DuplicatePendingRequest { .. }) => println!("Request Pending"),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Crate-wide result alias
pub type Result<T, E = DyehouseError> = std::result::Result<T, E>;

/// Where an error is recovered and how it is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    StateConflict,
    NotAuthenticated,
    NotAuthorized,
    NotFound,
    Transient,
    Internal,
}

/// A single invalid form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The main error type
#[derive(Debug, Error)]
pub enum DyehouseError {
    /// One or more form fields are invalid
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// No denier, SL number or order item was provided
    #[error("you must enter at least one denier or one SL number with quantity")]
    NoItems,

    /// A status string outside the pipeline
    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    /// Malformed request (bad id, unparsable body)
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// A change request is already pending for this order
    #[error("order {order_id} already has a pending change request")]
    DuplicatePendingRequest { order_id: Uuid },

    /// The change request is not in the state the transition requires
    #[error("change request {request_id} is {state}, expected pending")]
    InvalidState { request_id: Uuid, state: String },

    /// No approved change request is left to drive an edit
    #[error("no unused approved change request for order {order_id}")]
    NoUnusedApprovedRequest { order_id: Uuid },

    /// A submission for the same entity is still in flight
    #[error("{id} is already being processed")]
    Busy { id: Uuid },

    /// Missing or rejected credential
    #[error("not authenticated: {message}")]
    NotAuthenticated { message: String },

    /// Role policy violation
    #[error("not authorized: {message}")]
    NotAuthorized { message: String },

    /// Entity lookup failed
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: String, id: String },

    /// Network failure or non-2xx response without a structured body
    #[error("network error: {message}")]
    Transient { message: String },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Should not happen in normal operation
    #[error("internal error: {0}")]
    Internal(String),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error body exchanged over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DyehouseError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        DyehouseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        DyehouseError::NotAuthorized {
            message: message.into(),
        }
    }

    pub fn not_authenticated(message: impl Into<String>) -> Self {
        DyehouseError::NotAuthenticated {
            message: message.into(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        DyehouseError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DyehouseError::Validation(_)
            | DyehouseError::NoItems
            | DyehouseError::UnknownStatus(_)
            | DyehouseError::BadRequest { .. } => ErrorKind::Validation,
            DyehouseError::DuplicatePendingRequest { .. }
            | DyehouseError::InvalidState { .. }
            | DyehouseError::NoUnusedApprovedRequest { .. }
            | DyehouseError::Busy { .. } => ErrorKind::StateConflict,
            DyehouseError::NotAuthenticated { .. } => ErrorKind::NotAuthenticated,
            DyehouseError::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            DyehouseError::NotFound { .. } => ErrorKind::NotFound,
            DyehouseError::Transient { .. } => ErrorKind::Transient,
            DyehouseError::Config { .. } | DyehouseError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only transient failures are safe to retry by hand
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DyehouseError::Validation(_) | DyehouseError::NoItems => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DyehouseError::UnknownStatus(_) | DyehouseError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            DyehouseError::DuplicatePendingRequest { .. }
            | DyehouseError::InvalidState { .. }
            | DyehouseError::NoUnusedApprovedRequest { .. }
            | DyehouseError::Busy { .. } => StatusCode::CONFLICT,
            DyehouseError::NotAuthenticated { .. } => StatusCode::UNAUTHORIZED,
            DyehouseError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            DyehouseError::NotFound { .. } => StatusCode::NOT_FOUND,
            DyehouseError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DyehouseError::Config { .. } | DyehouseError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DyehouseError::Validation(_) => "VALIDATION_ERROR",
            DyehouseError::NoItems => "NO_ITEMS",
            DyehouseError::UnknownStatus(_) => "UNKNOWN_STATUS",
            DyehouseError::BadRequest { .. } => "BAD_REQUEST",
            DyehouseError::DuplicatePendingRequest { .. } => "DUPLICATE_PENDING_REQUEST",
            DyehouseError::InvalidState { .. } => "INVALID_STATE",
            DyehouseError::NoUnusedApprovedRequest { .. } => "NO_UNUSED_APPROVED_REQUEST",
            DyehouseError::Busy { .. } => "BUSY",
            DyehouseError::NotAuthenticated { .. } => "NOT_AUTHENTICATED",
            DyehouseError::NotAuthorized { .. } => "NOT_AUTHORIZED",
            DyehouseError::NotFound { .. } => "NOT_FOUND",
            DyehouseError::Transient { .. } => "TRANSIENT",
            DyehouseError::Config { .. } => "CONFIG_ERROR",
            DyehouseError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the end user
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotAuthorized | ErrorKind::NotFound => {
                self.to_string()
            }
            ErrorKind::StateConflict => match self {
                DyehouseError::DuplicatePendingRequest { .. } => {
                    "Request Pending: an admin has not reviewed the previous request yet".to_string()
                }
                DyehouseError::Busy { .. } => "Still processing, please wait".to_string(),
                _ => format!("{}. The list has been refreshed.", self),
            },
            ErrorKind::NotAuthenticated => "Your session has expired, please log in again".to_string(),
            ErrorKind::Transient => "Could not reach the server, please try again".to_string(),
            ErrorKind::Internal => "Something went wrong on our side".to_string(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            DyehouseError::Validation(errors) => Some(serde_json::json!({ "fields": errors })),
            DyehouseError::UnknownStatus(status) => Some(serde_json::json!({ "status": status })),
            DyehouseError::DuplicatePendingRequest { order_id }
            | DyehouseError::NoUnusedApprovedRequest { order_id } => {
                Some(serde_json::json!({ "orderId": order_id }))
            }
            DyehouseError::InvalidState { request_id, state } => Some(serde_json::json!({
                "requestId": request_id,
                "state": state
            })),
            DyehouseError::Busy { id } => Some(serde_json::json!({ "id": id })),
            DyehouseError::NotFound { entity, id } => Some(serde_json::json!({
                "entity": entity,
                "id": id
            })),
            _ => None,
        }
    }

    /// Rebuild a typed error from an HTTP status and an optional error body
    ///
    /// A response without a structured body is transient, except for 401 and
    /// 403 which keep their meaning.
    pub fn from_response(status: u16, body: Option<ErrorResponse>) -> Self {
        let Some(body) = body else {
            return match status {
                401 => DyehouseError::not_authenticated("credential rejected"),
                403 => DyehouseError::not_authorized("forbidden"),
                _ => DyehouseError::Transient {
                    message: format!("unexpected response status {}", status),
                },
            };
        };

        let details = body.details.unwrap_or(Value::Null);
        let uuid_at = |key: &str| {
            details[key]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_default()
        };
        let str_at = |key: &str| details[key].as_str().unwrap_or_default().to_string();

        match body.code.as_str() {
            "VALIDATION_ERROR" => {
                let fields = serde_json::from_value(details["fields"].clone()).unwrap_or_default();
                DyehouseError::Validation(fields)
            }
            "NO_ITEMS" => DyehouseError::NoItems,
            "UNKNOWN_STATUS" => DyehouseError::UnknownStatus(str_at("status")),
            "BAD_REQUEST" => DyehouseError::BadRequest {
                message: body.message,
            },
            "DUPLICATE_PENDING_REQUEST" => DyehouseError::DuplicatePendingRequest {
                order_id: uuid_at("orderId"),
            },
            "INVALID_STATE" => DyehouseError::InvalidState {
                request_id: uuid_at("requestId"),
                state: str_at("state"),
            },
            "NO_UNUSED_APPROVED_REQUEST" => DyehouseError::NoUnusedApprovedRequest {
                order_id: uuid_at("orderId"),
            },
            "BUSY" => DyehouseError::Busy { id: uuid_at("id") },
            "NOT_AUTHENTICATED" => DyehouseError::NotAuthenticated {
                message: body.message,
            },
            "NOT_AUTHORIZED" => DyehouseError::NotAuthorized {
                message: body.message,
            },
            "NOT_FOUND" => DyehouseError::NotFound {
                entity: str_at("entity"),
                id: str_at("id"),
            },
            "CONFIG_ERROR" => DyehouseError::Config {
                message: body.message,
            },
            "INTERNAL_ERROR" => DyehouseError::Internal(body.message),
            _ => DyehouseError::Transient {
                message: body.message,
            },
        }
    }
}

impl IntoResponse for DyehouseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<serde_yaml::Error> for DyehouseError {
    fn from(err: serde_yaml::Error) -> Self {
        DyehouseError::Config {
            message: err.to_string(),
        }
    }
}

impl From<uuid::Error> for DyehouseError {
    fn from(err: uuid::Error) -> Self {
        DyehouseError::BadRequest {
            message: format!("invalid id: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_status_codes() {
        assert_eq!(DyehouseError::NoItems.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            DyehouseError::DuplicatePendingRequest { order_id: Uuid::nil() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DyehouseError::not_authenticated("missing").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(DyehouseError::not_authorized("role").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(DyehouseError::not_found("order", "x").status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_display_lists_fields() {
        let err = DyehouseError::Validation(vec![
            FieldError::new("partyName", "Party Name is required"),
            FieldError::new("date", "Backdating orders is not allowed"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("partyName: Party Name is required"));
        assert!(msg.contains("date: Backdating orders is not allowed"));
    }

    #[test]
    fn test_response_round_trips_typed_variant() {
        let order_id = Uuid::new_v4();
        let original = DyehouseError::NoUnusedApprovedRequest { order_id };
        let rebuilt = DyehouseError::from_response(409, Some(original.to_response()));
        match rebuilt {
            DyehouseError::NoUnusedApprovedRequest { order_id: id } => assert_eq!(id, order_id),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validation_fields_survive_response() {
        let original = DyehouseError::field("salespersonId", "Salesperson is required");
        match DyehouseError::from_response(422, Some(original.to_response())) {
            DyehouseError::Validation(fields) => {
                assert_eq!(fields, vec![FieldError::new("salespersonId", "Salesperson is required")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unstructured_response_is_transient_unless_auth() {
        assert!(DyehouseError::from_response(502, None).is_retryable());
        assert_eq!(
            DyehouseError::from_response(401, None).kind(),
            ErrorKind::NotAuthenticated
        );
        assert_eq!(DyehouseError::from_response(403, None).kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(!DyehouseError::NoItems.is_retryable());
        assert!(!DyehouseError::not_authorized("x").is_retryable());
        assert!(DyehouseError::Transient { message: "down".into() }.is_retryable());
    }

    #[test]
    fn test_duplicate_pending_user_message_is_informational() {
        let err = DyehouseError::DuplicatePendingRequest { order_id: Uuid::nil() };
        assert!(err.user_message().starts_with("Request Pending"));
    }
}
