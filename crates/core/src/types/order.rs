//! Purchase-order records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::OrderId;

/// A purchase order as returned by the API.
///
/// `total_price` is computed by the server (`quantity * unit_price`) and is
/// trusted as-is; it is never recomputed on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: OrderId,
    pub item_name: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Payload for creating a purchase order.
///
/// Carries no `total_price`; the server derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub item_name: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub quantity: u32,
    /// Sent as a JSON number; the API models prices as floats.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl NewPurchaseOrder {
    /// Build the stored record the way the reference server does.
    ///
    /// Only in-memory stand-ins for the API should call this.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> PurchaseOrder {
        let total_price = self.unit_price * Decimal::from(self.quantity);
        PurchaseOrder {
            id,
            item_name: self.item_name,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price,
        }
    }
}
