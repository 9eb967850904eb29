//! Tracking update pipeline
//!
//! Pushes tracking codes for newly shipped packages back to the
//! marketplace. The pipeline checkpoints after every shipment, so an
//! interrupted run resumes without re-pushing anything already attempted;
//! the fetch watermark only advances once a whole batch is exhausted.

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};

use super::progress::{ProgressBus, ProgressEvent, ProgressPhase};
use crate::fulfillment::{DateRange, FulfillmentApi};
use crate::marketplace::{MarketplaceApi, MarketplaceError};
use crate::models::{Account, Courier, OrderId, SyncTime};
use crate::storage::StateStore;

/// Fetch window for a store that has never synced
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// One shipment whose tracking push failed
#[derive(Debug, Clone)]
pub struct FailedShipment {
    pub shipment_id: String,
    pub order_ids: Vec<OrderId>,
    pub error: String,
}

/// Per-account outcome of a tracking-update run
#[derive(Debug, Clone, Default)]
pub struct AccountTrackingReport {
    pub account: String,
    /// Shipments returned by the fulfillment platform before filtering
    pub shipments_seen: usize,
    pub updated: usize,
    /// Marketplace already had tracking; handled, not an error
    pub already_tracked: usize,
    /// Shipments with no marketplace order reference to push to
    pub skipped: usize,
    pub errors: usize,
    pub failed_shipments: Vec<FailedShipment>,
    pub error: Option<String>,
}

/// Aggregate outcome of a tracking-update run
#[derive(Debug, Clone, Default)]
pub struct TrackingResult {
    pub success: bool,
    pub accounts: Vec<AccountTrackingReport>,
    pub shipments_seen: usize,
    pub updated: usize,
    pub already_tracked: usize,
    pub errors: usize,
}

/// Run the tracking-update pipeline for the given accounts, sequentially
pub fn run_tracking_update(
    accounts: &[Account],
    marketplace: &dyn MarketplaceApi,
    fulfillment: &dyn FulfillmentApi,
    store: &dyn StateStore,
    bus: &ProgressBus,
) -> TrackingResult {
    let mut result = TrackingResult {
        success: true,
        ..TrackingResult::default()
    };

    for account in accounts {
        match update_account_tracking(account, marketplace, fulfillment, store, bus) {
            Ok(report) => {
                result.shipments_seen += report.shipments_seen;
                result.updated += report.updated;
                result.already_tracked += report.already_tracked;
                result.errors += report.errors;
                result.success &= report.errors == 0;
                result.accounts.push(report);
            }
            Err(e) => {
                error!(
                    "Tracking update failed for account {}: {:#}",
                    account.name, e
                );
                bus.publish(
                    ProgressEvent::log(ProgressPhase::Error, format!("{:#}", e))
                        .account(&account.name),
                );
                result.success = false;
                result.accounts.push(AccountTrackingReport {
                    account: account.name.clone(),
                    error: Some(format!("{:#}", e)),
                    ..AccountTrackingReport::default()
                });
            }
        }
    }

    bus.publish(
        ProgressEvent::new(ProgressPhase::Complete)
            .counts(result.shipments_seen, result.shipments_seen)
            .outcomes(result.updated, result.errors),
    );

    result
}

/// Run the pipeline for one account
fn update_account_tracking(
    account: &Account,
    marketplace: &dyn MarketplaceApi,
    fulfillment: &dyn FulfillmentApi,
    store: &dyn StateStore,
    bus: &ProgressBus,
) -> anyhow::Result<AccountTrackingReport> {
    let sync_time = store.get_sync_time(&account.store_id)?;
    let mut state = store
        .get_tracking_state(&account.store_id)?
        .unwrap_or_default();
    if !state.is_empty() {
        info!(
            "Resuming tracking batch for {}: {} shipments already processed",
            account.name,
            state.processed_shipment_ids.len()
        );
    }

    let range = fetch_window(sync_time.as_ref(), Utc::now());
    bus.publish(
        ProgressEvent::log(
            ProgressPhase::Fetch,
            format!("Fetching shipped packages for {}", account.name),
        )
        .account(&account.name),
    );

    let shipments = fulfillment.list_shipped_with_tracking(&account.store_id, &range)?;
    let shipments_seen = shipments.len();

    bus.publish(
        ProgressEvent::new(ProgressPhase::Filtering)
            .account(&account.name)
            .counts(0, shipments_seen),
    );
    let pending: Vec<_> = shipments
        .into_iter()
        .filter(|s| !state.contains(&s.id))
        .collect();
    let total = pending.len();

    let mut report = AccountTrackingReport {
        account: account.name.clone(),
        shipments_seen,
        ..AccountTrackingReport::default()
    };

    if total == 0 {
        // Nothing new; still emit a terminal event so observers see the
        // run complete rather than stall at zero.
        bus.publish(
            ProgressEvent::new(ProgressPhase::Complete)
                .account(&account.name)
                .counts(0, 0),
        );
        store.save_sync_time(&account.store_id, SyncTime::new(range.end))?;
        store.clear_tracking_state(&account.store_id)?;
        return Ok(report);
    }

    for (index, shipment) in pending.iter().enumerate() {
        if shipment.marketplace_order_ids.is_empty() {
            warn!(
                "Shipment {} has no marketplace order reference, skipping",
                shipment.id
            );
            report.skipped += 1;
        } else {
            let courier = courier_for_carrier(shipment.carrier_code.as_deref());
            match marketplace.attach_tracking(
                account,
                &shipment.marketplace_order_ids,
                &shipment.tracking_code,
                courier,
            ) {
                Ok(()) => {
                    info!(
                        "Pushed tracking {} for shipment {}",
                        shipment.tracking_code, shipment.id
                    );
                    report.updated += 1;
                }
                Err(MarketplaceError::AlreadyTracked) => {
                    report.already_tracked += 1;
                }
                Err(e) => {
                    warn!(
                        "Tracking push failed for shipment {}: {}",
                        shipment.id, e
                    );
                    report.errors += 1;
                    report.failed_shipments.push(FailedShipment {
                        shipment_id: shipment.id.clone(),
                        order_ids: shipment.marketplace_order_ids.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Checkpoint after every shipment, success or not, so a crash here
        // resumes with exactly the remaining shipments.
        state.record(&shipment.id);
        store.save_tracking_state(&account.store_id, state.clone())?;

        bus.publish(
            ProgressEvent::new(ProgressPhase::Updating)
                .account(&account.name)
                .counts(index + 1, total)
                .outcomes(report.updated, report.errors),
        );
    }

    // The whole filtered batch was attempted: advance the watermark and
    // drop the resume state. A crash before this point leaves both
    // untouched, so the next run re-derives the same batch minus the
    // shipments already recorded.
    store.save_sync_time(&account.store_id, SyncTime::new(range.end))?;
    store.clear_tracking_state(&account.store_id)?;

    bus.publish(
        ProgressEvent::new(ProgressPhase::Complete)
            .account(&account.name)
            .counts(total, total)
            .outcomes(report.updated, report.errors),
    );

    Ok(report)
}

/// Date range to fetch shipments for, bounded by the last watermark
pub(crate) fn fetch_window(last: Option<&SyncTime>, now: DateTime<Utc>) -> DateRange {
    let start = match last {
        Some(t) => t.last_sync,
        None => now - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    DateRange { start, end: now }
}

/// Map a fulfillment carrier code to the marketplace courier vocabulary
///
/// Unknown or absent codes default to USPS, by far the most common
/// carrier for this order volume.
pub fn courier_for_carrier(code: Option<&str>) -> Courier {
    match code.map(str::to_ascii_lowercase).as_deref() {
        Some("ups" | "ups_walleted") => Courier::Ups,
        Some("fedex") => Courier::FedEx,
        Some("dhl" | "dhl_express" | "dhl_global_mail") => Courier::Dhl,
        Some("usps" | "stamps_com" | "endicia") => Courier::Usps,
        _ => Courier::Usps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_courier_mapping() {
        assert_eq!(courier_for_carrier(Some("usps")), Courier::Usps);
        assert_eq!(courier_for_carrier(Some("stamps_com")), Courier::Usps);
        assert_eq!(courier_for_carrier(Some("UPS")), Courier::Ups);
        assert_eq!(courier_for_carrier(Some("fedex")), Courier::FedEx);
        assert_eq!(courier_for_carrier(Some("dhl_express")), Courier::Dhl);
    }

    #[test]
    fn test_unknown_carrier_defaults_to_usps() {
        assert_eq!(courier_for_carrier(Some("pigeon_post")), Courier::Usps);
        assert_eq!(courier_for_carrier(None), Courier::Usps);
    }

    #[test]
    fn test_fetch_window_uses_watermark() {
        let now = Utc::now();
        let watermark = SyncTime::new(now - Duration::hours(6));

        let range = fetch_window(Some(&watermark), now);
        assert_eq!(range.start, watermark.last_sync);
        assert_eq!(range.end, now);
    }

    #[test]
    fn test_fetch_window_without_watermark_looks_back() {
        let now = Utc::now();
        let range = fetch_window(None, now);
        assert_eq!(range.start, now - Duration::days(7));
        assert_eq!(range.end, now);
    }
}
