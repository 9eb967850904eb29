//! Fulfillment API response normalization
//!
//! Converts shipment records to domain models and decodes the marketplace
//! order ids embedded in line-item SKUs.

use chrono::{DateTime, Utc};

use super::api::ShipmentRecord;
use crate::models::{OrderId, Shipment};

/// Filter and convert raw shipment records
///
/// Drops voided shipments and shipments without a tracking number; the
/// tracking pipeline can do nothing useful with either.
pub fn usable_shipments(records: Vec<ShipmentRecord>) -> Vec<Shipment> {
    records
        .into_iter()
        .filter_map(shipment_from_record)
        .collect()
}

fn shipment_from_record(record: ShipmentRecord) -> Option<Shipment> {
    if record.voided {
        return None;
    }
    let tracking_code = record.tracking_number.filter(|t| !t.is_empty())?;

    let shipped_at = record
        .ship_date
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);

    Some(Shipment {
        id: record.shipment_id.to_string(),
        order_key: record.order_key,
        tracking_code,
        carrier_code: record.carrier_code,
        created_at: record.create_date.as_deref().and_then(parse_timestamp),
        shipped_at,
        marketplace_order_ids: order_ids_from_skus(&record.shipment_items),
    })
}

/// Decode the originating marketplace order ids from line-item SKUs
///
/// Consolidated orders are created with each item's SKU set to its source
/// marketplace order id, so the distinct SKUs of a shipment are exactly
/// the orders it fulfils. Order of first occurrence is preserved.
fn order_ids_from_skus(items: &Option<Vec<super::api::ShipmentItem>>) -> Vec<OrderId> {
    let mut ids: Vec<OrderId> = Vec::new();

    if let Some(items) = items {
        for item in items {
            if let Some(sku) = &item.sku {
                if sku.is_empty() {
                    continue;
                }
                let id = OrderId::new(sku);
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }

    ids
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
