//! Order synchronization pipeline
//!
//! Drives fetch → validate → consolidate → create for each account in
//! turn. A failing account is recorded and skipped; the run carries on,
//! so one bad token never blocks the other accounts.

use log::{error, info};

use super::consolidate::{build_shipping_order, group_orders};
use super::progress::{ProgressBus, ProgressEvent, ProgressPhase};
use super::validate::validate_orders;
use crate::fulfillment::{CreateProgress, FulfillmentApi};
use crate::marketplace::MarketplaceApi;
use crate::models::Account;

/// Per-account outcome of an order-sync run
#[derive(Debug, Clone, Default)]
pub struct AccountOrderReport {
    pub account: String,
    pub orders_fetched: usize,
    pub orders_valid: usize,
    pub orders_rejected: usize,
    pub groups_total: usize,
    pub groups_created: usize,
    pub groups_failed: usize,
    /// Set when the whole account failed; per-group failures live in
    /// `groups_failed` instead
    pub error: Option<String>,
}

/// Aggregate outcome of an order-sync run
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// False if any account failed outright; individual accounts' work
    /// is preserved either way
    pub success: bool,
    pub accounts: Vec<AccountOrderReport>,
    pub orders_fetched: usize,
    pub orders_valid: usize,
    pub orders_rejected: usize,
    pub groups_created: usize,
    pub groups_failed: usize,
}

/// Run the order-sync pipeline for the given accounts, sequentially
pub fn run_order_sync(
    accounts: &[Account],
    marketplace: &dyn MarketplaceApi,
    fulfillment: &dyn FulfillmentApi,
    bus: &ProgressBus,
) -> SyncResult {
    let mut result = SyncResult {
        success: true,
        ..SyncResult::default()
    };

    for account in accounts {
        match sync_account(account, marketplace, fulfillment, bus) {
            Ok(report) => {
                result.orders_fetched += report.orders_fetched;
                result.orders_valid += report.orders_valid;
                result.orders_rejected += report.orders_rejected;
                result.groups_created += report.groups_created;
                result.groups_failed += report.groups_failed;
                result.accounts.push(report);
            }
            Err(e) => {
                error!("Order sync failed for account {}: {:#}", account.name, e);
                bus.publish(
                    ProgressEvent::log(ProgressPhase::Error, format!("{:#}", e))
                        .account(&account.name),
                );
                result.success = false;
                result.accounts.push(AccountOrderReport {
                    account: account.name.clone(),
                    error: Some(format!("{:#}", e)),
                    ..AccountOrderReport::default()
                });
            }
        }
    }

    // Terminal event: the denominator is the number of marketplace orders
    // fetched, and processed == total so percentage displays land on 100.
    bus.publish(
        ProgressEvent::new(ProgressPhase::Complete)
            .counts(result.orders_fetched, result.orders_fetched)
            .outcomes(result.groups_created, result.groups_failed),
    );

    result
}

/// Run the pipeline for one account
fn sync_account(
    account: &Account,
    marketplace: &dyn MarketplaceApi,
    fulfillment: &dyn FulfillmentApi,
    bus: &ProgressBus,
) -> anyhow::Result<AccountOrderReport> {
    bus.publish(
        ProgressEvent::log(
            ProgressPhase::Fetch,
            format!("Fetching new orders for {}", account.name),
        )
        .account(&account.name),
    );

    let orders = marketplace.fetch_new_orders(account)?;
    let orders_fetched = orders.len();
    bus.publish(
        ProgressEvent::new(ProgressPhase::Fetch)
            .account(&account.name)
            .counts(orders_fetched, orders_fetched),
    );

    bus.publish(
        ProgressEvent::new(ProgressPhase::Validation)
            .account(&account.name)
            .counts(0, orders_fetched),
    );
    let outcome = validate_orders(orders);
    for rejected in &outcome.rejected {
        let reasons = rejected
            .reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "Order {} not shippable: {}",
            rejected.order.id.as_str(),
            reasons
        );
    }

    let groups = group_orders(&outcome.valid);
    let shipping_orders: Vec<_> = groups.iter().map(build_shipping_order).collect();

    // The post-consolidation count is the authoritative creation
    // denominator; it can be well below the order count.
    bus.publish(
        ProgressEvent::new(ProgressPhase::CreationStart)
            .account(&account.name)
            .counts(0, shipping_orders.len()),
    );

    let mut on_progress = |p: CreateProgress| {
        bus.publish(
            ProgressEvent::new(ProgressPhase::Creation)
                .account(&account.name)
                .counts(p.processed, p.total)
                .outcomes(p.created, p.failed),
        );
    };
    let created = fulfillment.create_orders(&shipping_orders, &account.store_id, &mut on_progress)?;

    info!(
        "Account {}: {} orders fetched, {} valid, {} groups created, {} failed",
        account.name,
        orders_fetched,
        outcome.valid.len(),
        created.successful.len(),
        created.failed.len()
    );

    bus.publish(
        ProgressEvent::new(ProgressPhase::Complete)
            .account(&account.name)
            .counts(orders_fetched, orders_fetched)
            .outcomes(created.successful.len(), created.failed.len()),
    );

    Ok(AccountOrderReport {
        account: account.name.clone(),
        orders_fetched,
        orders_valid: outcome.valid.len(),
        orders_rejected: outcome.rejected.len(),
        groups_total: shipping_orders.len(),
        groups_created: created.successful.len(),
        groups_failed: created.failed.len(),
        error: None,
    })
}
