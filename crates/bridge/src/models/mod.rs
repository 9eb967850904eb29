//! Domain models for orders, shipments, accounts, and sync checkpoints

mod account;
mod order;
mod shipment;
mod sync_state;

pub use account::Account;
pub use order::{
    Address, Customer, LineItem, MarketplaceOrder, Money, OrderId, OrderStatus, OrderTotals,
    TrackingInfo,
};
pub use shipment::{Courier, Shipment};
pub use sync_state::{OrderCursor, SyncTime, TrackingState};
