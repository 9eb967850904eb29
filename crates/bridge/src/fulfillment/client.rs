//! Fulfillment platform HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Every request
//! passes through the client-side rate limiter; 429 responses are retried
//! with the server-provided backoff up to a fixed attempt ceiling, and 401
//! fails fast so bad credentials never burn the retry budget.

use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, Utc};

use super::api::{CreateOrderResponse, NewShippingOrder, ShipmentsPage};
use super::normalize::usable_shipments;
use super::rate_limit::RateLimiter;
use crate::config::FulfillmentCredentials;
use crate::models::Shipment;

/// Documented ceiling of the fulfillment API
const REQUESTS_PER_MINUTE: u32 = 40;
/// Total attempts for a rate-limited call (initial try included)
const MAX_ATTEMPTS: u32 = 3;
/// Backoff used when a 429 carries no Retry-After header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);
/// Shipments fetched per page
const SHIPMENTS_PAGE_SIZE: u32 = 100;

/// Errors surfaced by the fulfillment client
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    /// Credentials rejected (HTTP 401); fatal, never retried
    #[error("fulfillment authentication failed (check API credentials)")]
    Auth,
    /// HTTP 429; retried internally, surfaced once attempts are exhausted
    #[error("fulfillment rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("fulfillment request failed: {0}")]
    Transport(String),
    #[error("fulfillment API error: {0}")]
    Api(String),
    #[error("failed to decode fulfillment response: {0}")]
    Decode(String),
}

impl From<ureq::Error> for FulfillmentError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Inclusive date range for the shipment listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One successfully created (or upserted) shipping order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_key: String,
    pub order_id: i64,
}

/// One shipping order that could not be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOrder {
    pub order_key: String,
    pub error: String,
}

/// Result of a batch of sequential order creations
#[derive(Debug, Default, Clone)]
pub struct CreateOrdersOutcome {
    pub successful: Vec<CreatedOrder>,
    pub failed: Vec<FailedOrder>,
}

/// Cumulative progress after each attempted group
///
/// `total` is the post-consolidation group count, which may be smaller
/// than the number of marketplace orders behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateProgress {
    pub processed: usize,
    pub total: usize,
    pub created: usize,
    pub failed: usize,
}

/// Operations the sync pipelines need from the fulfillment platform
pub trait FulfillmentApi: Send + Sync {
    /// Create consolidated shipping orders, one call per group, invoking
    /// `on_progress` after every group whether it succeeded or failed
    fn create_orders(
        &self,
        orders: &[NewShippingOrder],
        store_id: &str,
        on_progress: &mut dyn FnMut(CreateProgress),
    ) -> Result<CreateOrdersOutcome, FulfillmentError>;

    /// List completed, non-voided shipments with a tracking number in the
    /// given date range
    fn list_shipped_with_tracking(
        &self,
        store_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Shipment>, FulfillmentError>;
}

/// Fulfillment API client
pub struct FulfillmentClient {
    agent: ureq::Agent,
    auth_header: String,
    limiter: RateLimiter,
}

impl FulfillmentClient {
    /// Fulfillment API base URL
    const BASE_URL: &'static str = "https://api.shipport.com/v1";

    pub fn new(credentials: &FulfillmentCredentials) -> Self {
        // Non-2xx statuses are inspected, not turned into transport errors,
        // so 429 handling can read the Retry-After header.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let token = BASE64_STANDARD.encode(format!(
            "{}:{}",
            credentials.api_key, credentials.api_secret
        ));

        Self {
            agent: ureq::Agent::new_with_config(config),
            auth_header: format!("Basic {}", token),
            limiter: RateLimiter::per_minute(REQUESTS_PER_MINUTE),
        }
    }

    /// Create one shipping order
    fn post_order(
        &self,
        order: &NewShippingOrder,
        store_id: &str,
    ) -> Result<CreateOrderResponse, FulfillmentError> {
        self.limiter.acquire();

        let url = format!(
            "{}/orders/createorder?storeId={}",
            Self::BASE_URL,
            urlencoding::encode(store_id)
        );
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .send_json(order)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(self.error_for_status(status, &mut response));
        }

        response
            .body_mut()
            .read_json()
            .map_err(|e| FulfillmentError::Decode(e.to_string()))
    }

    /// Fetch one page of shipments
    fn shipments_page(
        &self,
        store_id: &str,
        range: &DateRange,
        page: u32,
    ) -> Result<ShipmentsPage, FulfillmentError> {
        self.limiter.acquire();

        let url = format!(
            "{}/shipments?storeId={}&shipDateStart={}&shipDateEnd={}&page={}&pageSize={}&includeShipmentItems=true",
            Self::BASE_URL,
            urlencoding::encode(store_id),
            urlencoding::encode(&range.start.to_rfc3339()),
            urlencoding::encode(&range.end.to_rfc3339()),
            page,
            SHIPMENTS_PAGE_SIZE,
        );
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .call()?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(self.error_for_status(status, &mut response));
        }

        response
            .body_mut()
            .read_json()
            .map_err(|e| FulfillmentError::Decode(e.to_string()))
    }

    fn error_for_status(
        &self,
        status: u16,
        response: &mut ureq::http::Response<ureq::Body>,
    ) -> FulfillmentError {
        match status {
            401 => FulfillmentError::Auth,
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(parse_retry_after)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                FulfillmentError::RateLimited { retry_after }
            }
            _ => {
                let body = response
                    .body_mut()
                    .read_to_string()
                    .unwrap_or_default();
                FulfillmentError::Api(format!("HTTP {}: {}", status, body))
            }
        }
    }
}

impl FulfillmentApi for FulfillmentClient {
    fn create_orders(
        &self,
        orders: &[NewShippingOrder],
        store_id: &str,
        on_progress: &mut dyn FnMut(CreateProgress),
    ) -> Result<CreateOrdersOutcome, FulfillmentError> {
        let total = orders.len();
        let mut outcome = CreateOrdersOutcome::default();

        // One call per consolidated group, sequentially, so a partial
        // failure stays attributable to a single group.
        for (index, order) in orders.iter().enumerate() {
            match with_retry(MAX_ATTEMPTS, || self.post_order(order, store_id)) {
                Ok(created) => {
                    log::info!("Created shipping order {}", created.order_key);
                    outcome.successful.push(CreatedOrder {
                        order_key: created.order_key,
                        order_id: created.order_id,
                    });
                }
                // Bad credentials fail every subsequent call too
                Err(FulfillmentError::Auth) => return Err(FulfillmentError::Auth),
                Err(e) => {
                    log::warn!(
                        "Failed to create shipping order {}: {}",
                        order.order_key,
                        e
                    );
                    outcome.failed.push(FailedOrder {
                        order_key: order.order_key.clone(),
                        error: e.to_string(),
                    });
                }
            }

            on_progress(CreateProgress {
                processed: index + 1,
                total,
                created: outcome.successful.len(),
                failed: outcome.failed.len(),
            });
        }

        Ok(outcome)
    }

    fn list_shipped_with_tracking(
        &self,
        store_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Shipment>, FulfillmentError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let response =
                with_retry(MAX_ATTEMPTS, || self.shipments_page(store_id, range, page))?;

            if response.shipments.is_empty() {
                break;
            }
            records.extend(response.shipments);

            if page >= response.pages {
                break;
            }
            page += 1;
        }

        Ok(usable_shipments(records))
    }
}

/// Bounded retry for rate-limited calls
///
/// Retries only `RateLimited` errors, sleeping the server-provided delay;
/// every other error (including `Auth`) fails immediately.
pub(crate) fn with_retry<T>(
    max_attempts: u32,
    mut call: impl FnMut() -> Result<T, FulfillmentError>,
) -> Result<T, FulfillmentError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call() {
            Ok(value) => return Ok(value),
            Err(FulfillmentError::RateLimited { retry_after }) if attempt < max_attempts => {
                log::warn!(
                    "Fulfillment rate limit hit (attempt {}/{}), retrying in {:?}",
                    attempt,
                    max_attempts,
                    retry_after
                );
                std::thread::sleep(retry_after);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse a Retry-After header value (delay-seconds form)
fn parse_retry_after(value: &str) -> Duration {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn rate_limited() -> FulfillmentError {
        FulfillmentError::RateLimited {
            retry_after: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_with_retry_succeeds_after_two_rate_limits() {
        let calls = Cell::new(0);

        let result = with_retry(3, || {
            calls.set(calls.get() + 1);
            if calls.get() <= 2 {
                Err(rate_limited())
            } else {
                Ok("created")
            }
        });

        assert_eq!(result.unwrap(), "created");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_with_retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);

        let result: Result<(), _> = with_retry(3, || {
            calls.set(calls.get() + 1);
            Err(rate_limited())
        });

        assert!(matches!(
            result,
            Err(FulfillmentError::RateLimited { .. })
        ));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_with_retry_never_retries_auth() {
        let calls = Cell::new(0);

        let result: Result<(), _> = with_retry(3, || {
            calls.set(calls.get() + 1);
            Err(FulfillmentError::Auth)
        });

        assert!(matches!(result, Err(FulfillmentError::Auth)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("2"), Duration::from_secs(2));
        assert_eq!(parse_retry_after(" 10 "), Duration::from_secs(10));
        // Date form and garbage fall back to the default
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"),
            DEFAULT_RETRY_AFTER
        );
    }
}
