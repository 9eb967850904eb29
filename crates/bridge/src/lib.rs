//! Bridge crate - Order and tracking synchronization between a
//! live-commerce marketplace and a shipping platform
//!
//! This crate provides platform-independent sync functionality including:
//! - Domain models (MarketplaceOrder, Shipment, Account, sync checkpoints)
//! - Marketplace API client with cursor-driven, resumable pagination
//! - Rate-limited, retrying fulfillment platform client
//! - Pure order validation and consolidation
//! - Idempotent, resumable order-sync and tracking-update pipelines
//! - Storage trait abstractions for the persisted checkpoints
//!
//! This crate has zero UI dependencies; the dashboard, scheduler, and CLI
//! live elsewhere and drive it through [`SyncService`].

pub mod config;
pub mod fulfillment;
pub mod marketplace;
pub mod models;
pub mod storage;
pub mod sync;

pub use config::{FulfillmentCredentials, SyncSettings, load_accounts};
pub use fulfillment::{
    CreateOrdersOutcome, CreateProgress, DateRange, FulfillmentApi, FulfillmentClient,
    FulfillmentError, RateLimiter,
};
pub use marketplace::{MarketplaceApi, MarketplaceClient, MarketplaceError};
pub use models::{
    Account, Address, Courier, Customer, LineItem, MarketplaceOrder, Money, OrderCursor, OrderId,
    OrderStatus, OrderTotals, Shipment, SyncTime, TrackingInfo, TrackingState,
};
pub use storage::{InMemoryStateStore, SqliteStateStore, StateStore};
pub use sync::{
    AccountOrderReport, AccountTrackingReport, Pipeline, ProgressBus, ProgressEvent,
    ProgressPhase, RunState, SyncError, SyncResult, SyncService, TrackingResult,
    run_order_sync, run_tracking_update, validate_orders,
};
