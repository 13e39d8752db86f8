//! Which order fields a user may edit, and through which path
//!
//! | Role     | one-time edit             | approved change request |
//! |----------|---------------------------|-------------------------|
//! | admin    | no                        | no                      |
//! | operator | no                        | every field but `date`  |
//! | factory  | `deliveryParty`, `sdyNumber` | `deliveryParty`      |
//! | sales    | no                        | no                      |
//!
//! `date` is never editable once the order exists. The resolver is pure; the
//! backend calls it again before applying a patch.

use crate::core::change_request::ChangeRequest;
use crate::core::draft::{ItemInput, to_quantity};
use crate::core::error::{DyehouseError, Result};
use crate::core::order::{Order, OrderItem};
use crate::core::role::Role;
use crate::core::validation::{FormCheck, filters, validators};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Editable fields of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    SdyNumber,
    Date,
    PartyName,
    DeliveryParty,
    Salesperson,
    Items,
}

impl OrderField {
    pub const ALL: [OrderField; 6] = [
        OrderField::SdyNumber,
        OrderField::Date,
        OrderField::PartyName,
        OrderField::DeliveryParty,
        OrderField::Salesperson,
        OrderField::Items,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderField::SdyNumber => "sdyNumber",
            OrderField::Date => "date",
            OrderField::PartyName => "partyName",
            OrderField::DeliveryParty => "deliveryParty",
            OrderField::Salesperson => "salesperson",
            OrderField::Items => "items",
        }
    }
}

/// How an edit is authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "requestId", rename_all = "camelCase")]
pub enum EditPath {
    /// The factory's single free edit
    FactoryOneTime,
    /// An approved, unused change request
    ChangeRequest(Uuid),
    /// Nothing allows an edit right now
    Locked,
}

/// Total field map plus the path that grants it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableFields {
    pub path: EditPath,
    pub fields: BTreeMap<OrderField, bool>,
}

impl EditableFields {
    fn grant(path: EditPath, allowed: &[OrderField]) -> Self {
        let fields = OrderField::ALL
            .iter()
            .map(|f| (*f, *f != OrderField::Date && allowed.contains(f)))
            .collect();
        Self { path, fields }
    }

    pub fn locked() -> Self {
        Self::grant(EditPath::Locked, &[])
    }

    pub fn can_edit(&self, field: OrderField) -> bool {
        self.fields.get(&field).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.fields.values().any(|v| *v)
    }

    pub fn allowed(&self) -> Vec<OrderField> {
        self.fields
            .iter()
            .filter(|(_, v)| **v)
            .map(|(f, _)| *f)
            .collect()
    }
}

const FACTORY_ONE_TIME: &[OrderField] = &[OrderField::DeliveryParty, OrderField::SdyNumber];
const FACTORY_CHANGE_REQUEST: &[OrderField] = &[OrderField::DeliveryParty];
const OPERATOR_CHANGE_REQUEST: &[OrderField] = &[
    OrderField::SdyNumber,
    OrderField::PartyName,
    OrderField::DeliveryParty,
    OrderField::Salesperson,
    OrderField::Items,
];

/// Editable fields for `role` on `order`
///
/// `active_request` only counts when it is approved, unused and targets this
/// order. The factory one-time edit is chosen before any change request.
pub fn resolve_editable_fields(
    role: Role,
    order: &Order,
    active_request: Option<&ChangeRequest>,
) -> EditableFields {
    let usable = active_request.filter(|r| r.order_id == order.id && r.is_approved_unused());

    match (role, usable) {
        (Role::Factory, _) if !order.factory_one_time_edit_used => {
            EditableFields::grant(EditPath::FactoryOneTime, FACTORY_ONE_TIME)
        }
        (Role::Factory, Some(r)) => {
            EditableFields::grant(EditPath::ChangeRequest(r.id), FACTORY_CHANGE_REQUEST)
        }
        (Role::Operator, Some(r)) => {
            EditableFields::grant(EditPath::ChangeRequest(r.id), OPERATOR_CHANGE_REQUEST)
        }
        _ => EditableFields::locked(),
    }
}

/// What the dashboard should offer a user for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "requestId", rename_all = "camelCase")]
pub enum EditRoute {
    FactoryOneTime,
    ChangeRequest(Uuid),
    AwaitingApproval,
    RequestChange,
    Unavailable,
}

/// Pick the edit affordance for `role` given the requests visible to the user
pub fn route_edit(role: Role, user_id: Uuid, order: &Order, requests: &[ChangeRequest]) -> EditRoute {
    if !role.can_request_changes() {
        return EditRoute::Unavailable;
    }
    if role == Role::Factory && !order.factory_one_time_edit_used {
        return EditRoute::FactoryOneTime;
    }
    if let Some(r) = crate::core::change_request::first_unused_approved(requests, order.id, user_id) {
        return EditRoute::ChangeRequest(r.id);
    }
    if requests.iter().any(|r| r.order_id == order.id && r.is_pending()) {
        return EditRoute::AwaitingApproval;
    }
    EditRoute::RequestChange
}

/// Partial order update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salesperson_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemInput>>,
    /// Request to spend; defaults to the earliest approved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_request_id: Option<Uuid>,
}

impl OrderPatch {
    pub fn touched_fields(&self) -> Vec<OrderField> {
        let mut touched = Vec::new();
        if self.sdy_number.is_some() {
            touched.push(OrderField::SdyNumber);
        }
        if self.date.is_some() {
            touched.push(OrderField::Date);
        }
        if self.party_name.is_some() {
            touched.push(OrderField::PartyName);
        }
        if self.delivery_party.is_some() {
            touched.push(OrderField::DeliveryParty);
        }
        if self.salesperson_id.is_some() {
            touched.push(OrderField::Salesperson);
        }
        if self.items.is_some() {
            touched.push(OrderField::Items);
        }
        touched
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }
}

/// Reject a patch that touches anything `editable` does not grant
pub fn check_patch(editable: &EditableFields, patch: &OrderPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(DyehouseError::BadRequest {
            message: "nothing to update".to_string(),
        });
    }

    let denied: Vec<&str> = patch
        .touched_fields()
        .into_iter()
        .filter(|f| !editable.can_edit(*f))
        .map(|f| f.as_str())
        .collect();

    if denied.is_empty() {
        Ok(())
    } else {
        Err(DyehouseError::not_authorized(format!(
            "cannot edit {}",
            denied.join(", ")
        )))
    }
}

/// Apply a checked patch to `order`
///
/// Text is normalized the same way as on creation. Items carrying the id of an
/// existing item keep their status and history; new rows start received with
/// one history entry for `editor`.
pub fn apply_patch(order: &mut Order, patch: &OrderPatch, editor: Uuid, now: DateTime<Utc>) -> Result<()> {
    let mut form = FormCheck::new();
    let sdy_number = patch.sdy_number.as_deref().map(filters::code);
    let party_name = patch.party_name.as_deref().map(filters::code);

    if let Some(sdy) = &sdy_number {
        form.check("sdyNumber", sdy.as_str(), validators::required("SDY Number is required"));
    }
    if let Some(party) = &party_name {
        form.check("partyName", party.as_str(), validators::required("Party Name is required"));
    }
    if let Some(rows) = &patch.items {
        for (i, row) in rows.iter().enumerate() {
            if let Some(q) = &row.quantity {
                form.check(&format!("items[{}].quantity", i), q, validators::positive());
            }
        }
    }
    form.finish()?;

    let items = match &patch.items {
        Some(rows) => Some(rebuild_items(order, rows, editor, now)?),
        None => None,
    };

    if let Some(sdy) = sdy_number {
        order.sdy_number = sdy;
    }
    if let Some(party) = party_name {
        order.party_name = party;
    }
    if let Some(delivery) = patch.delivery_party.as_deref() {
        order.delivery_party = filters::code(delivery);
    }
    if let Some(salesperson) = patch.salesperson_id {
        order.salesperson_id = Some(salesperson);
    }
    if let Some(items) = items {
        order.replace_items(items)?;
    }
    order.touch(now);
    Ok(())
}

fn rebuild_items(order: &Order, rows: &[ItemInput], editor: Uuid, now: DateTime<Utc>) -> Result<Vec<OrderItem>> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for row in rows.iter().filter(|row| row.is_meaningful()) {
        let denier = filters::optional_code(&row.denier);
        let sl_number = filters::optional_code(&row.sl_number);
        let quantity = row.quantity.map(to_quantity).unwrap_or(1);

        if let Some(id) = row.id {
            if !seen.insert(id) {
                return Err(DyehouseError::field("items", format!("item {} is listed twice", id)));
            }
        }

        let item = match row.id.and_then(|id| order.item(&id)) {
            Some(existing) => {
                let mut item = existing.clone();
                item.denier = denier;
                item.sl_number = sl_number;
                item.quantity = quantity;
                item
            }
            None => {
                let mut item = OrderItem::new(denier, sl_number, quantity);
                let status = item.status;
                item.append_status_history(status, editor, now);
                item
            }
        };
        items.push(item);
    }

    if items.is_empty() {
        return Err(DyehouseError::NoItems);
    }
    Ok(items)
}
