//! Fulfillment platform API integration
//!
//! This module provides:
//! - Rate-limited, retrying HTTP access to the fulfillment platform
//! - Sequential creation of consolidated shipping orders
//! - Paginated listing of shipped packages with tracking
//! - Response normalization to domain models

mod client;
mod normalize;
mod rate_limit;

pub use client::{
    CreateOrdersOutcome, CreateProgress, CreatedOrder, DateRange, FailedOrder, FulfillmentApi,
    FulfillmentClient, FulfillmentError,
};
pub use normalize::usable_shipments;
pub use rate_limit::RateLimiter;

/// Fulfillment API request/response types
pub mod api {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};

    /// One consolidated shipping order, ready to create
    ///
    /// The `order_key` is derived deterministically from the source order
    /// group, so re-sending the same group upserts instead of duplicating.
    /// Line-item SKUs carry the originating marketplace order id.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewShippingOrder {
        pub order_key: String,
        pub order_date: String,
        pub order_status: String,
        pub customer_username: String,
        pub bill_to: OrderAddress,
        pub ship_to: OrderAddress,
        pub items: Vec<NewOrderItem>,
        pub amount_paid: Decimal,
        pub shipping_amount: Decimal,
        pub tax_amount: Decimal,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrderAddress {
        pub name: String,
        pub street1: String,
        pub street2: Option<String>,
        pub city: String,
        pub state: String,
        pub postal_code: String,
        pub country: String,
        pub phone: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewOrderItem {
        /// Source marketplace order id, preserved for traceability
        pub sku: String,
        pub name: String,
        pub quantity: u32,
        pub unit_price: Decimal,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateOrderResponse {
        pub order_id: i64,
        pub order_key: String,
    }

    /// Envelope of the paginated shipment listing
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShipmentsPage {
        pub shipments: Vec<ShipmentRecord>,
        pub total: u32,
        pub page: u32,
        pub pages: u32,
    }

    /// One shipment as returned by the listing endpoint
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShipmentRecord {
        pub shipment_id: i64,
        pub order_key: Option<String>,
        pub tracking_number: Option<String>,
        pub carrier_code: Option<String>,
        #[serde(default)]
        pub voided: bool,
        pub create_date: Option<String>,
        pub ship_date: Option<String>,
        pub shipment_items: Option<Vec<ShipmentItem>>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShipmentItem {
        pub sku: Option<String>,
        pub name: Option<String>,
        pub quantity: u32,
    }
}
