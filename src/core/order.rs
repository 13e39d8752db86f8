//! Order aggregate and its items
//!
//! The authoritative production status lives on each [`OrderItem`]. The
//! order-level status is derived for display and recomputed whenever items
//! change.

use crate::core::error::{DyehouseError, Result};
use crate::core::status::{self, Status};
use crate::core::user::UserSummary;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of an item's status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    pub updated_by: Uuid,
}

/// A yarn line within an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,

    /// Yarn thickness code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl_number: Option<String>,

    /// Kilograms
    pub quantity: u32,

    pub status: Status,

    #[serde(default)]
    status_history: Vec<StatusUpdate>,
}

impl OrderItem {
    /// New item in the first pipeline status with an empty history
    pub fn new(denier: Option<String>, sl_number: Option<String>, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            denier: denier.filter(|d| !d.trim().is_empty()),
            sl_number: sl_number.filter(|s| !s.trim().is_empty()),
            quantity: quantity.max(1),
            status: Status::first(),
            status_history: Vec::new(),
        }
    }

    pub fn with_denier(denier: impl Into<String>) -> Self {
        Self::new(Some(denier.into()), None, 1)
    }

    pub fn with_sl_number(sl_number: impl Into<String>, quantity: u32) -> Self {
        Self::new(None, Some(sl_number.into()), quantity)
    }

    /// True when the item names a denier or an SL number
    pub fn is_meaningful(&self) -> bool {
        self.denier.is_some() || self.sl_number.is_some()
    }

    /// Record a status change
    ///
    /// Earlier entries are never touched. Any status may follow any other.
    pub fn append_status_history(&mut self, status: Status, user_id: Uuid, timestamp: DateTime<Utc>) {
        self.status = status;
        self.status_history.push(StatusUpdate {
            status,
            timestamp,
            updated_by: user_id,
        });
    }

    pub fn history(&self) -> &[StatusUpdate] {
        &self.status_history
    }
}

/// The order aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub sdy_number: String,
    pub date: NaiveDate,
    pub party_name: String,
    pub delivery_party: String,

    #[serde(default)]
    pub salesperson_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salesperson: Option<UserSummary>,

    #[serde(default)]
    current_status: Option<Status>,

    items: Vec<OrderItem>,

    #[serde(default)]
    pub factory_one_time_edit_used: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header fields of a new order
#[derive(Debug, Clone)]
pub struct OrderHeader {
    pub sdy_number: String,
    pub date: NaiveDate,
    pub party_name: String,
    pub delivery_party: String,
    pub salesperson_id: Option<Uuid>,
}

impl Order {
    /// Assemble a new order
    ///
    /// Fails with `NoItems` unless at least one item names a denier or an SL
    /// number.
    pub fn new(header: OrderHeader, items: Vec<OrderItem>, now: DateTime<Utc>) -> Result<Self> {
        if !items.iter().any(OrderItem::is_meaningful) {
            return Err(DyehouseError::NoItems);
        }

        let mut order = Self {
            id: Uuid::new_v4(),
            sdy_number: header.sdy_number,
            date: header.date,
            party_name: header.party_name,
            delivery_party: header.delivery_party,
            salesperson_id: header.salesperson_id,
            salesperson: None,
            current_status: None,
            items,
            factory_one_time_edit_used: false,
            created_at: now,
            updated_at: now,
        };
        order.refresh_current_status();
        Ok(order)
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: &Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    pub fn has_item(&self, item_id: &Uuid) -> bool {
        self.item(item_id).is_some()
    }

    /// Most advanced item status, display only
    pub fn current_status(&self) -> Option<Status> {
        self.current_status
    }

    pub fn has_meaningful_item(&self) -> bool {
        self.items.iter().any(OrderItem::is_meaningful)
    }

    /// Append an item, keeping insertion order
    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
        self.refresh_current_status();
    }

    /// Remove an item
    ///
    /// Removing the last remaining item is a no-op and returns `false`, as does
    /// an unknown id.
    pub fn remove_item(&mut self, item_id: &Uuid) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|i| &i.id != item_id);
        let removed = self.items.len() != before;
        if removed {
            self.refresh_current_status();
        }
        removed
    }

    /// Replace the whole item list, as an operator's full edit does
    pub fn replace_items(&mut self, items: Vec<OrderItem>) -> Result<()> {
        if !items.iter().any(OrderItem::is_meaningful) {
            return Err(DyehouseError::NoItems);
        }
        self.items = items;
        self.refresh_current_status();
        Ok(())
    }

    /// Set one item's status and append the matching history entry
    pub fn set_item_status(
        &mut self,
        item_id: &Uuid,
        status: Status,
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<&OrderItem> {
        let index = self
            .items
            .iter()
            .position(|i| &i.id == item_id)
            .ok_or_else(|| DyehouseError::not_found("order item", item_id))?;

        self.items[index].append_status_history(status, user_id, timestamp);
        self.updated_at = timestamp;
        self.refresh_current_status();
        Ok(&self.items[index])
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn refresh_current_status(&mut self) {
        self.current_status = status::most_advanced(self.items.iter().map(|i| i.status));
    }

    /// Case-insensitive match against the order's text fields and item codes
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(&needle);
        hit(&self.sdy_number)
            || hit(&self.party_name)
            || hit(&self.delivery_party)
            || self.items.iter().any(|i| {
                i.denier.as_deref().is_some_and(hit) || i.sl_number.as_deref().is_some_and(hit)
            })
    }
}
