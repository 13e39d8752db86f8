//! Request bodies shared by the server and the HTTP client

use crate::core::change_request::Decision;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `PUT /order-items/{id}/status`
///
/// The status stays a raw string so an unknown value is reported as
/// `UNKNOWN_STATUS` rather than a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// Body of `POST /change-requests`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangeRequest {
    pub order_id: Uuid,
}

/// Body of `PATCH /change-requests/{id}/process`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDecision {
    pub status: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}
