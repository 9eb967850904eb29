//! Shipment model representing a completed fulfillment-platform shipment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderId;

/// Courier vocabulary accepted by the marketplace tracking mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Courier {
    Usps,
    Ups,
    FedEx,
    Dhl,
}

impl Courier {
    /// The identifier the marketplace API expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usps => "USPS",
            Self::Ups => "UPS",
            Self::FedEx => "FEDEX",
            Self::Dhl => "DHL",
        }
    }
}

/// A completed, non-voided shipment with a tracking number
///
/// The fulfillment platform embeds the originating marketplace order ids
/// in the shipment's line-item SKUs; they are decoded at the client
/// boundary so the tracking pipeline can map a shipment back to the
/// orders it fulfils.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub order_key: Option<String>,
    pub tracking_code: String,
    pub carrier_code: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub shipped_at: DateTime<Utc>,
    pub marketplace_order_ids: Vec<OrderId>,
}
