//! Synchronization service facade
//!
//! Owns the clients, the state store, and the progress bus, and exposes
//! the two pipeline operations. At most one run executes at a time
//! process-wide; a second start request is rejected with a conflict
//! error, never queued.

use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use super::orders::{SyncResult, run_order_sync};
use super::progress::ProgressBus;
use super::tracking::{TrackingResult, run_tracking_update};
use crate::fulfillment::FulfillmentApi;
use crate::marketplace::MarketplaceApi;
use crate::models::Account;
use crate::storage::StateStore;

/// Which pipeline a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    OrderSync,
    TrackingUpdate,
}

/// Externally observable state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running(Pipeline),
}

/// Errors returned by the service entry points
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another run is in progress; the request was rejected, not queued
    #[error("a sync run is already in progress ({0:?})")]
    AlreadyRunning(Pipeline),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Main entry point for the synchronization engine
///
/// Construct once with the configured accounts and the platform clients,
/// then call [`run_order_sync`](Self::run_order_sync) or
/// [`run_tracking_update`](Self::run_tracking_update). Subscribe to
/// [`progress`](Self::progress) for typed progress events.
pub struct SyncService {
    accounts: Vec<Account>,
    marketplace: Arc<dyn MarketplaceApi>,
    fulfillment: Arc<dyn FulfillmentApi>,
    store: Arc<dyn StateStore>,
    bus: ProgressBus,
    state: Mutex<RunState>,
}

impl SyncService {
    pub fn new(
        accounts: Vec<Account>,
        marketplace: Arc<dyn MarketplaceApi>,
        fulfillment: Arc<dyn FulfillmentApi>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            accounts,
            marketplace,
            fulfillment,
            store,
            bus: ProgressBus::new(),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// The progress bus both pipelines publish to
    pub fn progress(&self) -> &ProgressBus {
        &self.bus
    }

    /// Current run state
    pub fn status(&self) -> RunState {
        *self.state.lock().unwrap()
    }

    /// Pull new marketplace orders and create consolidated shipping orders
    ///
    /// `filter` selects accounts by name; `None` runs every enabled
    /// account.
    pub fn run_order_sync(&self, filter: Option<&[String]>) -> Result<SyncResult, SyncError> {
        let _guard = self.begin(Pipeline::OrderSync)?;
        let accounts = self.resolve_accounts(filter)?;

        Ok(run_order_sync(
            &accounts,
            self.marketplace.as_ref(),
            self.fulfillment.as_ref(),
            &self.bus,
        ))
    }

    /// Pull newly shipped packages and push tracking codes back
    pub fn run_tracking_update(
        &self,
        filter: Option<&[String]>,
    ) -> Result<TrackingResult, SyncError> {
        let _guard = self.begin(Pipeline::TrackingUpdate)?;
        let accounts = self.resolve_accounts(filter)?;

        Ok(run_tracking_update(
            &accounts,
            self.marketplace.as_ref(),
            self.fulfillment.as_ref(),
            self.store.as_ref(),
            &self.bus,
        ))
    }

    /// Acquire the single-flight guard or reject with the active pipeline
    fn begin(&self, pipeline: Pipeline) -> Result<RunGuard<'_>, SyncError> {
        let mut state = self.state.lock().unwrap();
        if let RunState::Running(active) = *state {
            return Err(SyncError::AlreadyRunning(active));
        }
        *state = RunState::Running(pipeline);
        Ok(RunGuard { state: &self.state })
    }

    /// Resolve the account filter against configuration
    fn resolve_accounts(&self, filter: Option<&[String]>) -> Result<Vec<Account>, SyncError> {
        match filter {
            None => Ok(self
                .accounts
                .iter()
                .filter(|a| a.enabled)
                .cloned()
                .collect()),
            Some(names) => {
                let mut selected = Vec::new();
                for name in names {
                    let account = self
                        .accounts
                        .iter()
                        .find(|a| &a.name == name)
                        .ok_or_else(|| SyncError::UnknownAccount(name.clone()))?;
                    if account.enabled {
                        selected.push(account.clone());
                    } else {
                        warn!("Account {} is disabled, skipping", name);
                    }
                }
                Ok(selected)
            }
        }
    }
}

/// Releases the single-flight guard on scope exit, error paths included
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state: MutexGuard<'_, RunState> = self.state.lock().unwrap();
        *state = RunState::Idle;
    }
}
