//! Order consolidation
//!
//! Groups marketplace orders placed by the same customer in the same
//! selling session into one shipping order. Grouping is deterministic:
//! the same input batch always produces the same groups in the same
//! order, which keeps the derived order keys stable across retries.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::fulfillment::api::{NewOrderItem, NewShippingOrder, OrderAddress};
use crate::models::{Address, MarketplaceOrder};

/// Destination status for newly created shipping orders
const NEW_ORDER_STATUS: &str = "awaiting_shipment";

/// A set of orders from one customer in one selling session
#[derive(Debug, Clone)]
pub struct OrderGroup {
    pub session_id: String,
    pub customer_username: String,
    pub orders: Vec<MarketplaceOrder>,
}

impl OrderGroup {
    /// Deterministic key for the consolidated shipping order
    ///
    /// Derived only from (session, customer), so a retried run upserts
    /// the same destination order instead of duplicating it.
    pub fn order_key(&self) -> String {
        format!("{}-{}", self.session_id, self.customer_username)
    }
}

/// Derive the selling-session identifier for an order
///
/// Orders placed in a live stream use the stream reference; orders placed
/// outside one fall back to the creation date, so a customer's same-day
/// orders still combine.
pub fn session_id(order: &MarketplaceOrder) -> String {
    match &order.stream_id {
        Some(stream) if !stream.is_empty() => stream.clone(),
        _ => order.created_at.format("%Y-%m-%d").to_string(),
    }
}

/// Partition orders into consolidated groups
///
/// Cancelled orders are skipped. Groups appear in order of first
/// occurrence of their key; orders keep their input order within a group.
pub fn group_orders(orders: &[MarketplaceOrder]) -> Vec<OrderGroup> {
    let mut groups: Vec<OrderGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for order in orders {
        if order.is_cancelled() {
            continue;
        }

        let session = session_id(order);
        let key = (session.clone(), order.customer.username.clone());

        match index.get(&key) {
            Some(&i) => groups[i].orders.push(order.clone()),
            None => {
                index.insert(key, groups.len());
                groups.push(OrderGroup {
                    session_id: session,
                    customer_username: order.customer.username.clone(),
                    orders: vec![order.clone()],
                });
            }
        }
    }

    groups
}

/// Build the consolidated shipping order for one group
///
/// One line item per source line item, with the SKU set to the source
/// marketplace order id so shipments can be mapped back later. Addresses
/// come from the group's first order; totals are summed across orders.
pub fn build_shipping_order(group: &OrderGroup) -> NewShippingOrder {
    let first = &group.orders[0];

    let mut items = Vec::new();
    let mut amount_paid = Decimal::ZERO;
    let mut shipping_amount = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;

    for order in &group.orders {
        amount_paid += order.totals.total.amount;
        shipping_amount += order.totals.shipping.amount;
        tax_amount += order.totals.tax.amount;

        for item in &order.items {
            items.push(NewOrderItem {
                sku: order.id.0.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price.amount,
            });
        }
    }

    let address = order_address(first.ship_to.as_ref(), &group.customer_username);

    NewShippingOrder {
        order_key: group.order_key(),
        order_date: first.created_at.to_rfc3339(),
        order_status: NEW_ORDER_STATUS.to_string(),
        customer_username: group.customer_username.clone(),
        bill_to: address.clone(),
        ship_to: address,
        items,
        amount_paid,
        shipping_amount,
        tax_amount,
    }
}

fn order_address(ship_to: Option<&Address>, username: &str) -> OrderAddress {
    match ship_to {
        Some(a) => OrderAddress {
            name: if a.name.is_empty() {
                username.to_string()
            } else {
                a.name.clone()
            },
            street1: a.street1.clone(),
            street2: a.street2.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.clone(),
            phone: a.phone.clone(),
        },
        None => OrderAddress {
            name: username.to_string(),
            ..OrderAddress::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Customer, LineItem, Money, OrderId, OrderStatus, OrderTotals,
    };
    use chrono::{TimeZone, Utc};

    fn make_order(id: &str, username: &str, stream: Option<&str>) -> MarketplaceOrder {
        MarketplaceOrder {
            id: OrderId::new(id),
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap(),
            cancelled_at: None,
            status: OrderStatus::Processing,
            customer: Customer::new(format!("cust-{}", username), username),
            ship_to: None,
            totals: OrderTotals {
                subtotal: Money::new(Decimal::new(1000, 2), "USD"),
                shipping: Money::new(Decimal::new(500, 2), "USD"),
                tax: Money::new(Decimal::new(80, 2), "USD"),
                total: Money::new(Decimal::new(1580, 2), "USD"),
            },
            stream_id: stream.map(String::from),
            tracking: None,
            items: vec![LineItem {
                id: format!("{}-i1", id),
                name: "Vintage denim jacket".to_string(),
                sku: Some("SKU-1".to_string()),
                quantity: 1,
                unit_price: Money::new(Decimal::new(1000, 2), "USD"),
                pickup: false,
                product_id: None,
            }],
        }
    }

    #[test]
    fn test_groups_by_session_and_customer() {
        let orders = vec![
            make_order("o1", "jane", Some("stream-1")),
            make_order("o2", "bob", Some("stream-1")),
            make_order("o3", "jane", Some("stream-1")),
            make_order("o4", "jane", Some("stream-2")),
        ];

        let groups = group_orders(&orders);
        assert_eq!(groups.len(), 3);

        // First occurrence order is preserved
        assert_eq!(groups[0].customer_username, "jane");
        assert_eq!(groups[0].session_id, "stream-1");
        assert_eq!(groups[0].orders.len(), 2);
        assert_eq!(groups[0].orders[0].id.as_str(), "o1");
        assert_eq!(groups[0].orders[1].id.as_str(), "o3");

        assert_eq!(groups[1].customer_username, "bob");
        assert_eq!(groups[2].session_id, "stream-2");
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let orders = vec![
            make_order("o1", "jane", Some("stream-1")),
            make_order("o2", "bob", None),
            make_order("o3", "jane", Some("stream-1")),
        ];

        let first = group_orders(&orders);
        let second = group_orders(&orders);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.order_key(), b.order_key());
            let ids_a: Vec<_> = a.orders.iter().map(|o| o.id.as_str()).collect();
            let ids_b: Vec<_> = b.orders.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn test_grouping_partitions_non_cancelled_input() {
        let mut cancelled = make_order("o3", "jane", Some("stream-1"));
        cancelled.cancelled_at = Some(Utc::now());

        let orders = vec![
            make_order("o1", "jane", Some("stream-1")),
            make_order("o2", "bob", Some("stream-1")),
            cancelled,
        ];

        let groups = group_orders(&orders);
        let mut grouped_ids: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.orders.iter().map(|o| o.id.as_str()))
            .collect();
        grouped_ids.sort_unstable();

        // Every non-cancelled order appears exactly once
        assert_eq!(grouped_ids, vec!["o1", "o2"]);
    }

    #[test]
    fn test_session_falls_back_to_creation_date() {
        let order = make_order("o1", "jane", None);
        assert_eq!(session_id(&order), "2025-03-14");

        let mut empty_stream = make_order("o2", "jane", Some(""));
        empty_stream.stream_id = Some(String::new());
        assert_eq!(session_id(&empty_stream), "2025-03-14");
    }

    #[test]
    fn test_order_key_is_stable() {
        let orders = vec![make_order("o1", "jane", Some("stream-1"))];
        let groups = group_orders(&orders);
        assert_eq!(groups[0].order_key(), "stream-1-jane");
    }

    #[test]
    fn test_build_shipping_order_consolidates() {
        let orders = vec![
            make_order("o1", "jane", Some("stream-1")),
            make_order("o2", "jane", Some("stream-1")),
        ];
        let groups = group_orders(&orders);
        let shipping = build_shipping_order(&groups[0]);

        assert_eq!(shipping.order_key, "stream-1-jane");
        assert_eq!(shipping.order_status, "awaiting_shipment");
        assert_eq!(shipping.items.len(), 2);

        // SKU carries the source order id, not the product SKU
        assert_eq!(shipping.items[0].sku, "o1");
        assert_eq!(shipping.items[1].sku, "o2");

        // Totals are summed across the group
        assert_eq!(shipping.amount_paid, Decimal::new(3160, 2));
        assert_eq!(shipping.shipping_amount, Decimal::new(1000, 2));
        assert_eq!(shipping.tax_amount, Decimal::new(160, 2));
    }

    #[test]
    fn test_build_shipping_order_without_address() {
        let orders = vec![make_order("o1", "jane", Some("stream-1"))];
        let groups = group_orders(&orders);
        let shipping = build_shipping_order(&groups[0]);

        assert_eq!(shipping.ship_to.name, "jane");
        assert!(shipping.ship_to.street1.is_empty());
    }
}
