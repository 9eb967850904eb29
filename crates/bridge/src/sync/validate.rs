//! Order validation ahead of shipping-order creation
//!
//! Pure predicate pipeline: no I/O, no mutation of the input orders.
//! Rejections are data, not errors; they are reported alongside the valid
//! orders and never abort a run.

use std::fmt;

use crate::models::{MarketplaceOrder, OrderStatus};

/// Why an order cannot be turned into a shipping order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Cancelled,
    AlreadyTracked,
    StatusNotShippable(OrderStatus),
    NoItems,
    /// Pickup orders are handed over in person, out of scope for shipping
    PickupItem,
    MissingSku { item_id: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "order is cancelled"),
            Self::AlreadyTracked => write!(f, "order already has tracking"),
            Self::StatusNotShippable(status) => {
                write!(f, "order status {} is not shippable", status.as_str())
            }
            Self::NoItems => write!(f, "order has no line items"),
            Self::PickupItem => write!(f, "order contains a pickup item"),
            Self::MissingSku { item_id } => {
                write!(f, "line item {} has no SKU", item_id)
            }
        }
    }
}

/// An order rejected by validation, with every applicable reason
#[derive(Debug, Clone)]
pub struct RejectedOrder {
    pub order: MarketplaceOrder,
    pub reasons: Vec<RejectReason>,
}

/// Result of validating a batch of orders
///
/// `valid.len() + rejected.len()` always equals the input length.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub valid: Vec<MarketplaceOrder>,
    pub rejected: Vec<RejectedOrder>,
}

/// Validate a batch of orders for shipment
pub fn validate_orders(orders: Vec<MarketplaceOrder>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for order in orders {
        let reasons = reject_reasons(&order);
        if reasons.is_empty() {
            outcome.valid.push(order);
        } else {
            outcome.rejected.push(RejectedOrder { order, reasons });
        }
    }

    outcome
}

/// Collect every applicable rejection reason for one order
///
/// An order with no line items returns immediately with that single
/// reason; the per-item checks are meaningless on an empty order.
fn reject_reasons(order: &MarketplaceOrder) -> Vec<RejectReason> {
    let mut reasons = Vec::new();

    if order.is_cancelled() {
        reasons.push(RejectReason::Cancelled);
    }
    if order.has_tracking() {
        reasons.push(RejectReason::AlreadyTracked);
    }
    if !order.status.is_shippable() && !order.is_cancelled() {
        reasons.push(RejectReason::StatusNotShippable(order.status.clone()));
    }

    if order.items.is_empty() {
        return vec![RejectReason::NoItems];
    }

    if order.items.iter().any(|item| item.pickup) {
        reasons.push(RejectReason::PickupItem);
    }
    for item in &order.items {
        if !item.pickup && item.sku.is_none() {
            reasons.push(RejectReason::MissingSku {
                item_id: item.id.clone(),
            });
        }
    }

    reasons
}
