//! Order model representing a marketplace order

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for a marketplace order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Order lifecycle status as reported by the marketplace
///
/// Only `Processing` orders are eligible for shipment. Statuses the
/// marketplace adds later are preserved as `Other` rather than rejected
/// at the parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    Other(String),
}

impl OrderStatus {
    /// Parse a status string from the marketplace API
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PROCESSING" => Self::Processing,
            "SHIPPED" => Self::Shipped,
            "DELIVERED" => Self::Delivered,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            "REFUNDED" => Self::Refunded,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Whether this status makes an order eligible for shipment
    pub fn is_shippable(&self) -> bool {
        matches!(self, Self::Processing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
            Self::Other(s) => s,
        }
    }
}

/// A monetary amount with its currency code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// A zero amount in the given currency
    pub fn zero(currency: impl Into<String>) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: currency.into(),
        }
    }
}

/// Monetary totals for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// All-zero totals in the given currency
    pub fn zero(currency: &str) -> Self {
        Self {
            subtotal: Money::zero(currency),
            shipping: Money::zero(currency),
            tax: Money::zero(currency),
            total: Money::zero(currency),
        }
    }
}

/// A shipping address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// The customer who placed an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub username: String,
}

impl Customer {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Tracking information already attached to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub code: String,
    pub courier: String,
}

/// One purchased line item within an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    /// Product title shown to the shipper
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    /// Pickup items are handed over in person and never shipped
    pub pickup: bool,
    pub product_id: Option<String>,
}

/// One order fetched from the marketplace
///
/// An immutable snapshot of the order as it was at fetch time. The sync
/// engine never mutates an order; any change of state happens on the
/// marketplace side and is observed on the next fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceOrder {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub customer: Customer,
    pub ship_to: Option<Address>,
    pub totals: OrderTotals,
    /// Reference to the live selling session this order was placed in
    pub stream_id: Option<String>,
    pub tracking: Option<TrackingInfo>,
    pub items: Vec<LineItem>,
}

impl MarketplaceOrder {
    /// Whether the order was cancelled, either by timestamp or by status
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some() || matches!(self.status, OrderStatus::Cancelled)
    }

    /// Whether the order already carries a tracking code
    pub fn has_tracking(&self) -> bool {
        self.tracking.as_ref().is_some_and(|t| !t.code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatus::parse("PROCESSING"), OrderStatus::Processing);
        assert_eq!(OrderStatus::parse("processing"), OrderStatus::Processing);
        assert_eq!(OrderStatus::parse("CANCELED"), OrderStatus::Cancelled);
        assert_eq!(
            OrderStatus::parse("ON_HOLD"),
            OrderStatus::Other("ON_HOLD".to_string())
        );
    }

    #[test]
    fn test_status_shippable() {
        assert!(OrderStatus::Processing.is_shippable());
        assert!(!OrderStatus::Shipped.is_shippable());
        assert!(!OrderStatus::Other("ON_HOLD".to_string()).is_shippable());
    }

    #[test]
    fn test_money_zero() {
        let m = Money::zero("USD");
        assert_eq!(m.amount, Decimal::ZERO);
        assert_eq!(m.currency, "USD");
    }
}
