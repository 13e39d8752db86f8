//! Order and change-request list queries
//!
//! These mirror the dashboard filters. Query strings use `all` or an empty
//! value for "no filter".
//!
//! # Example
//! ```rust,ignore
//! GET /orders?status=dyeing&searchTerm=abc&salespersonId=all
//! GET /orders?startDate=2024-03-01&endDate=2024-03-31
//! GET /change-requests?status=pending&orderId=...
//! ```

use crate::core::change_request::{ChangeRequest, ChangeRequestStatus};
use crate::core::order::Order;
use crate::core::status::Status;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Filters for `GET /orders`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilter {
    /// Matches when any item is in this status
    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Case-insensitive text search over codes and party names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,

    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub salesperson_id: Option<Uuid>,

    /// Inclusive
    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Inclusive
    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status
            .is_none_or(|status| order.items().iter().any(|i| i.status == status))
            && self
                .search_term
                .as_deref()
                .is_none_or(|term| order.matches_text(term))
            && self
                .salesperson_id
                .is_none_or(|id| order.salesperson_id == Some(id))
            && self.start_date.is_none_or(|start| order.date >= start)
            && self.end_date.is_none_or(|end| order.date <= end)
    }

    /// Matching orders, keeping their order
    pub fn apply<'a, I>(&self, orders: I) -> Vec<Order>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        orders
            .into_iter()
            .filter(|o| self.matches(o))
            .cloned()
            .collect()
    }
}

/// Filters for `GET /change-requests`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeRequestQuery {
    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub status: Option<ChangeRequestStatus>,

    #[serde(deserialize_with = "all_or", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

impl ChangeRequestQuery {
    pub fn pending() -> Self {
        Self {
            status: Some(ChangeRequestStatus::Pending),
            order_id: None,
        }
    }

    pub fn approved() -> Self {
        Self {
            status: Some(ChangeRequestStatus::Approved),
            order_id: None,
        }
    }

    pub fn matches(&self, request: &ChangeRequest) -> bool {
        self.status.is_none_or(|s| request.status == s)
            && self.order_id.is_none_or(|id| request.order_id == id)
    }
}

/// Number of orders whose current status is `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: Status,
    pub label: String,
    pub count: usize,
}

/// Dashboard counters over a set of orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total: usize,
    /// Not yet packed
    pub active: usize,
    pub completed: usize,
    /// One entry per status, in pipeline order
    pub by_status: Vec<StatusCount>,
}

impl OrderSummary {
    pub fn from_orders<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let statuses: Vec<Option<Status>> = orders.into_iter().map(Order::current_status).collect();
        let completed = statuses
            .iter()
            .filter(|s| **s == Some(Status::Packed))
            .count();

        let by_status = Status::all()
            .iter()
            .map(|status| StatusCount {
                status: *status,
                label: status.label().to_string(),
                count: statuses.iter().filter(|s| **s == Some(*status)).count(),
            })
            .collect();

        Self {
            total: statuses.len(),
            active: statuses.len() - completed,
            completed,
            by_status,
        }
    }
}

/// `None` for a missing value, an empty string or `all`
fn all_or<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
                Ok(None)
            } else {
                raw.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
    }
}
