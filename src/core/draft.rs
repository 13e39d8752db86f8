//! The create/edit order form
//!
//! An [`OrderDraft`] is what the dashboard submits. It is normalized, validated
//! and turned into an [`Order`] by [`create_order`].

use crate::core::auth::AuthContext;
use crate::core::error::{DyehouseError, Result};
use crate::core::order::{Order, OrderHeader, OrderItem};
use crate::core::validation::{FormCheck, filters, validators};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An SL number with its quantity in kg
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlQuantity {
    #[serde(default)]
    pub sl_number: String,
    #[serde(default, with = "lenient::quantity")]
    pub quantity: Option<i64>,
}

/// A combined denier / SL row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    /// Existing item being edited, keeps its status and history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub denier: String,
    #[serde(default)]
    pub sl_number: String,
    #[serde(default, with = "lenient::quantity")]
    pub quantity: Option<i64>,
}

impl ItemInput {
    pub fn is_meaningful(&self) -> bool {
        !self.denier.trim().is_empty() || (!self.sl_number.trim().is_empty() && self.quantity.is_some())
    }
}

/// Raw order form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Set when the form edits an existing order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub sdy_number: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub party_name: String,
    #[serde(default)]
    pub delivery_party: String,
    #[serde(default, with = "lenient::optional_uuid")]
    pub salesperson_id: Option<Uuid>,
    #[serde(default)]
    pub deniers: Vec<String>,
    #[serde(default)]
    pub sl_numbers_with_quantities: Vec<SlQuantity>,
    #[serde(default)]
    pub order_items: Vec<ItemInput>,
}

/// SDY number is mandatory only when the form edits an existing order
pub fn sdy_number_required(draft: &OrderDraft) -> bool {
    draft.id.is_some()
}

impl OrderDraft {
    /// Copy with every text input trimmed and uppercased
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id,
            sdy_number: filters::code(&self.sdy_number),
            date: self.date,
            party_name: filters::code(&self.party_name),
            delivery_party: filters::code(&self.delivery_party),
            salesperson_id: self.salesperson_id,
            deniers: self.deniers.iter().map(|d| filters::code(d)).collect(),
            sl_numbers_with_quantities: self
                .sl_numbers_with_quantities
                .iter()
                .map(|e| SlQuantity {
                    sl_number: filters::code(&e.sl_number),
                    quantity: e.quantity,
                })
                .collect(),
            order_items: self
                .order_items
                .iter()
                .map(|e| ItemInput {
                    id: e.id,
                    denier: filters::code(&e.denier),
                    sl_number: filters::code(&e.sl_number),
                    quantity: e.quantity,
                })
                .collect(),
        }
    }

    /// True when at least one input would produce an item
    pub fn has_items(&self) -> bool {
        self.deniers.iter().any(|d| !d.trim().is_empty())
            || self
                .sl_numbers_with_quantities
                .iter()
                .any(|e| !e.sl_number.trim().is_empty() && e.quantity.is_some())
            || self.order_items.iter().any(ItemInput::is_meaningful)
    }

    /// Add an empty SL row to the form
    pub fn add_sl_row(&mut self) {
        self.sl_numbers_with_quantities.push(SlQuantity::default());
    }

    /// Remove an SL row, never the last one
    pub fn remove_sl_row(&mut self, index: usize) -> bool {
        if self.sl_numbers_with_quantities.len() <= 1 || index >= self.sl_numbers_with_quantities.len() {
            return false;
        }
        self.sl_numbers_with_quantities.remove(index);
        true
    }

    /// Check every field rule
    ///
    /// The draft is expected to be normalized already. Missing items are
    /// reported as `NoItems` before any field error.
    pub fn validate(&self, actor: &AuthContext, today: NaiveDate) -> Result<()> {
        if !self.has_items() {
            return Err(DyehouseError::NoItems);
        }

        let mut form = FormCheck::new();
        if sdy_number_required(self) {
            form.check(
                "sdyNumber",
                self.sdy_number.as_str(),
                validators::required("SDY Number is required"),
            );
        }
        form.check(
            "partyName",
            self.party_name.as_str(),
            validators::required("Party Name is required"),
        );
        if let Some(date) = &self.date {
            form.check("date", date, validators::not_before(today));
        }
        if actor.role.assigns_salesperson() {
            form.check(
                "salespersonId",
                &self.salesperson_id,
                validators::present("Salesperson is required"),
            );
        }

        for (i, entry) in self.sl_numbers_with_quantities.iter().enumerate() {
            if entry.sl_number.trim().is_empty() {
                continue;
            }
            let field = format!("slNumbersWithQuantities[{}].quantity", i);
            match &entry.quantity {
                Some(q) => {
                    form.check(&field, q, validators::positive());
                }
                None => {
                    form.push(field, "Quantity is required for an SL number");
                }
            }
        }
        for (i, entry) in self.order_items.iter().enumerate() {
            if let Some(q) = &entry.quantity {
                form.check(&format!("orderItems[{}].quantity", i), q, validators::positive());
            } else if !entry.sl_number.trim().is_empty() && entry.denier.trim().is_empty() {
                form.push(
                    format!("orderItems[{}].quantity", i),
                    "Quantity is required for an SL number",
                );
            }
        }

        form.finish()
    }

    /// Items in input order: deniers, SL pairs, then combined rows
    pub fn build_items(&self) -> Vec<OrderItem> {
        let deniers = self
            .deniers
            .iter()
            .filter_map(|d| filters::optional_code(d))
            .map(OrderItem::with_denier);

        let sl_pairs = self.sl_numbers_with_quantities.iter().filter_map(|e| {
            let sl = filters::optional_code(&e.sl_number)?;
            Some(OrderItem::with_sl_number(sl, to_quantity(e.quantity?)))
        });

        let rows = self.order_items.iter().filter(|e| e.is_meaningful()).map(|e| {
            OrderItem::new(
                filters::optional_code(&e.denier),
                filters::optional_code(&e.sl_number),
                e.quantity.map(to_quantity).unwrap_or(1),
            )
        });

        deniers.chain(sl_pairs).chain(rows).collect()
    }
}

pub(crate) fn to_quantity(q: i64) -> u32 {
    u32::try_from(q.max(1)).unwrap_or(u32::MAX)
}

/// Validate a draft and assemble the order it describes
///
/// Every item starts in the first pipeline status with one history entry for
/// `actor`. A sales actor is their own salesperson.
pub fn create_order(
    draft: &OrderDraft,
    actor: &AuthContext,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Order> {
    let draft = draft.normalized();
    draft.validate(actor, today)?;

    let salesperson_id = if actor.role.assigns_salesperson() {
        draft.salesperson_id
    } else {
        Some(actor.user_id)
    };

    let mut items = draft.build_items();
    for item in &mut items {
        let status = item.status;
        item.append_status_history(status, actor.user_id, now);
    }

    Order::new(
        OrderHeader {
            sdy_number: draft.sdy_number,
            date: draft.date.unwrap_or(today),
            party_name: draft.party_name,
            delivery_party: draft.delivery_party,
            salesperson_id,
        },
        items,
        now,
    )
}

/// Form-friendly deserializers
pub(crate) mod lenient {
    /// Quantity as a JSON number or a numeric string; `""` and `null` are absent
    pub mod quantity {
        use serde::de::{self, Deserializer};
        use serde::{Deserialize, Serializer};

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(q) => serializer.serialize_i64(*q),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
            match Option::<Raw>::deserialize(deserializer)? {
                None => Ok(None),
                Some(Raw::Int(q)) => Ok(Some(q)),
                Some(Raw::Float(q)) if q.fract() == 0.0 => Ok(Some(q as i64)),
                Some(Raw::Float(q)) => Err(de::Error::custom(format!("quantity {} is not a whole number", q))),
                Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
                Some(Raw::Text(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| de::Error::custom(format!("quantity '{}' is not a number", s))),
            }
        }
    }

    /// Optional uuid where an empty string means unset
    pub mod optional_uuid {
        use serde::de::{self, Deserializer};
        use serde::{Deserialize, Serializer};
        use uuid::Uuid;

        pub fn serialize<S: Serializer>(value: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(id) => serializer.collect_str(id),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => Uuid::parse_str(s.trim()).map(Some).map_err(de::Error::custom),
            }
        }
    }
}
