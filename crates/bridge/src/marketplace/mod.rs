//! Marketplace API integration
//!
//! This module provides:
//! - Cursor-driven paginated reading of new orders and their line items
//! - The tracking-attachment mutation
//! - Response normalization to domain models

mod client;
mod normalize;

pub use client::{MarketplaceApi, MarketplaceClient, MarketplaceError};
pub use normalize::{normalize_item, normalize_order};

/// Marketplace API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Connection-style envelope for the paginated order query
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrdersPage {
        pub edges: Vec<OrderEdge>,
        pub page_info: PageInfo,
    }

    #[derive(Debug, Deserialize)]
    pub struct OrderEdge {
        pub cursor: String,
        pub node: OrderNode,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PageInfo {
        pub has_next_page: bool,
        pub end_cursor: Option<String>,
    }

    /// One order as returned by the order query
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrderNode {
        pub id: String,
        pub created_at: String,
        pub cancelled_at: Option<String>,
        pub status: String,
        pub customer: CustomerNode,
        pub shipping_address: Option<AddressNode>,
        pub subtotal: Option<MoneyNode>,
        pub shipping_total: Option<MoneyNode>,
        pub tax_total: Option<MoneyNode>,
        pub total: Option<MoneyNode>,
        pub stream_id: Option<String>,
        pub tracking_code: Option<String>,
        pub tracking_courier: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CustomerNode {
        pub id: String,
        pub username: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AddressNode {
        pub name: Option<String>,
        pub street1: String,
        pub street2: Option<String>,
        pub city: String,
        pub state: String,
        pub postal_code: String,
        pub country: Option<String>,
        pub phone: Option<String>,
    }

    /// Amounts come over the wire as decimal strings
    #[derive(Debug, Deserialize)]
    pub struct MoneyNode {
        pub amount: String,
        pub currency: String,
    }

    /// Connection-style envelope for the paginated line-item query
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ItemsPage {
        pub edges: Vec<ItemEdge>,
        pub page_info: PageInfo,
    }

    #[derive(Debug, Deserialize)]
    pub struct ItemEdge {
        pub cursor: String,
        pub node: ItemNode,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ItemNode {
        pub id: String,
        pub name: String,
        pub sku: Option<String>,
        pub quantity: u32,
        pub unit_price: Option<MoneyNode>,
        #[serde(default)]
        pub pickup: bool,
        pub product_id: Option<String>,
    }

    /// Request body for the tracking-attachment mutation
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttachTrackingRequest {
        pub order_ids: Vec<String>,
        pub tracking_code: String,
        pub courier: String,
    }

    /// Response of the tracking-attachment mutation
    ///
    /// An empty `user_errors` list means the mutation succeeded.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttachTrackingResponse {
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }

    /// Field-level error from a mutation
    #[derive(Debug, Clone, Deserialize)]
    pub struct UserError {
        pub field: Option<String>,
        pub message: String,
    }
}
