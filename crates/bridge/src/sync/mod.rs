//! Synchronization engine
//!
//! The two pipelines (order sync, tracking update) plus the pure
//! algorithms they compose: validation, consolidation, and progress
//! reporting. Both pipelines are idempotent and safe to re-run after a
//! partial failure.

mod consolidate;
mod orders;
mod progress;
mod service;
mod tracking;
mod validate;

pub use consolidate::{OrderGroup, build_shipping_order, group_orders, session_id};
pub use orders::{AccountOrderReport, SyncResult, run_order_sync};
pub use progress::{ProgressBus, ProgressEvent, ProgressPhase, RecentMessageCache};
pub use service::{Pipeline, RunState, SyncError, SyncService};
pub use tracking::{
    AccountTrackingReport, FailedShipment, TrackingResult, courier_for_carrier,
    run_tracking_update,
};
pub use validate::{RejectReason, RejectedOrder, ValidationOutcome, validate_orders};
