//! Marketplace API response normalization
//!
//! Converts marketplace wire types to domain models.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::api::{AddressNode, ItemNode, MoneyNode, OrderNode};
use crate::models::{
    Address, Customer, LineItem, MarketplaceOrder, Money, OrderId, OrderStatus, OrderTotals,
    TrackingInfo,
};

/// Currency assumed when the marketplace omits one
const DEFAULT_CURRENCY: &str = "USD";

/// Normalize a wire order to a domain order
///
/// Line items are fetched separately and arrive empty here.
pub fn normalize_order(node: &OrderNode) -> Result<MarketplaceOrder> {
    let created_at = parse_timestamp(&node.created_at)
        .with_context(|| format!("Order {} has an invalid createdAt", node.id))?;

    let cancelled_at = match &node.cancelled_at {
        Some(s) => Some(
            parse_timestamp(s)
                .with_context(|| format!("Order {} has an invalid cancelledAt", node.id))?,
        ),
        None => None,
    };

    let tracking = node.tracking_code.as_ref().map(|code| TrackingInfo {
        code: code.clone(),
        courier: node.tracking_courier.clone().unwrap_or_default(),
    });

    Ok(MarketplaceOrder {
        id: OrderId::new(&node.id),
        created_at,
        cancelled_at,
        status: OrderStatus::parse(&node.status),
        customer: Customer::new(&node.customer.id, &node.customer.username),
        ship_to: node.shipping_address.as_ref().map(normalize_address),
        totals: OrderTotals {
            subtotal: parse_money(node.subtotal.as_ref())?,
            shipping: parse_money(node.shipping_total.as_ref())?,
            tax: parse_money(node.tax_total.as_ref())?,
            total: parse_money(node.total.as_ref())?,
        },
        stream_id: node.stream_id.clone(),
        tracking,
        items: Vec::new(),
    })
}

/// Normalize a wire line item to a domain line item
pub fn normalize_item(node: &ItemNode) -> Result<LineItem> {
    Ok(LineItem {
        id: node.id.clone(),
        name: node.name.clone(),
        sku: node.sku.clone().filter(|s| !s.is_empty()),
        quantity: node.quantity,
        unit_price: parse_money(node.unit_price.as_ref())?,
        pickup: node.pickup,
        product_id: node.product_id.clone(),
    })
}

fn normalize_address(node: &AddressNode) -> Address {
    Address {
        name: node.name.clone().unwrap_or_default(),
        street1: node.street1.clone(),
        street2: node.street2.clone(),
        city: node.city.clone(),
        state: node.state.clone(),
        postal_code: node.postal_code.clone(),
        country: node.country.clone().unwrap_or_else(|| "US".to_string()),
        phone: node.phone.clone(),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

/// Parse a wire money node; a missing node is a zero amount
fn parse_money(node: Option<&MoneyNode>) -> Result<Money> {
    match node {
        Some(m) => {
            let amount: Decimal = m
                .amount
                .parse()
                .with_context(|| format!("Invalid amount: {}", m.amount))?;
            Ok(Money::new(amount, &m.currency))
        }
        None => Ok(Money::zero(DEFAULT_CURRENCY)),
    }
}
