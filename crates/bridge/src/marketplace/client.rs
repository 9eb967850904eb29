//! Marketplace API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Order fetching is
//! cursor-driven: the cursor is persisted through the [`StateStore`] after
//! every page, before the next page is requested, so an interrupted fetch
//! resumes where it left off instead of re-delivering earlier pages.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::api::{
    AttachTrackingRequest, AttachTrackingResponse, ItemsPage, OrdersPage, UserError,
};
use super::normalize::{normalize_item, normalize_order};
use crate::models::{Account, Courier, LineItem, MarketplaceOrder, OrderCursor, OrderId};
use crate::storage::StateStore;

/// Orders fetched per page
const ORDERS_PAGE_SIZE: usize = 50;
/// Line items fetched per page
const ITEMS_PAGE_SIZE: usize = 100;
/// Pause between order pages, to stay polite with the source API
const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Errors surfaced by the marketplace client
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// Missing or inconsistent configuration; fatal for the account, never retried
    #[error("marketplace configuration error: {0}")]
    Config(String),
    /// The marketplace rejected the account token
    #[error("marketplace authentication failed")]
    Auth,
    #[error("marketplace request failed: {0}")]
    Transport(String),
    #[error("failed to decode marketplace response: {0}")]
    Decode(String),
    /// The API processed the request but reported user errors
    #[error("marketplace rejected the request: {0}")]
    Api(String),
    /// The order already carries tracking the marketplace will not override.
    /// A distinct, non-fatal outcome for the tracking pipeline.
    #[error("order already has tracking")]
    AlreadyTracked,
    #[error("state store error: {0}")]
    Store(String),
}

impl From<ureq::Error> for MarketplaceError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(401) => Self::Auth,
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Operations the sync pipelines need from the marketplace
///
/// The HTTP client implements this; tests substitute scripted fakes.
pub trait MarketplaceApi: Send + Sync {
    /// Fetch all orders created since the account's cursor (or the
    /// configured minimum start date on first run), line items included
    fn fetch_new_orders(&self, account: &Account)
    -> Result<Vec<MarketplaceOrder>, MarketplaceError>;

    /// Fetch all line items of one order
    fn fetch_order_items(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<Vec<LineItem>, MarketplaceError>;

    /// Attach a tracking code to a set of orders
    fn attach_tracking(
        &self,
        account: &Account,
        order_ids: &[OrderId],
        tracking_code: &str,
        courier: Courier,
    ) -> Result<(), MarketplaceError>;
}

/// Marketplace API client
pub struct MarketplaceClient {
    store: Arc<dyn StateStore>,
    /// Lower bound for the first fetch of an account with no cursor yet.
    /// Required: without it a first run would pull the full order history.
    min_start_date: Option<DateTime<Utc>>,
}

impl MarketplaceClient {
    /// Marketplace API base URL
    const BASE_URL: &'static str = "https://api.sellcast.com/v2";

    pub fn new(store: Arc<dyn StateStore>, min_start_date: Option<DateTime<Utc>>) -> Self {
        Self {
            store,
            min_start_date,
        }
    }

    /// Fetch one page of orders
    fn orders_page(
        &self,
        token: &str,
        created_after: DateTime<Utc>,
        after: Option<&str>,
    ) -> Result<OrdersPage, MarketplaceError> {
        let mut url = format!(
            "{}/orders?first={}&createdAfter={}",
            Self::BASE_URL,
            ORDERS_PAGE_SIZE,
            urlencoding::encode(&created_after.to_rfc3339()),
        );

        if let Some(cursor) = after {
            url.push_str(&format!("&after={}", urlencoding::encode(cursor)));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", token))
            .call()?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| MarketplaceError::Decode(e.to_string()))
    }

    /// Fetch one page of line items for an order
    fn items_page(
        &self,
        token: &str,
        order_id: &OrderId,
        after: Option<&str>,
    ) -> Result<ItemsPage, MarketplaceError> {
        let mut url = format!(
            "{}/orders/{}/items?first={}",
            Self::BASE_URL,
            urlencoding::encode(order_id.as_str()),
            ITEMS_PAGE_SIZE,
        );

        if let Some(cursor) = after {
            url.push_str(&format!("&after={}", urlencoding::encode(cursor)));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", token))
            .call()?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| MarketplaceError::Decode(e.to_string()))
    }
}

impl MarketplaceApi for MarketplaceClient {
    fn fetch_new_orders(
        &self,
        account: &Account,
    ) -> Result<Vec<MarketplaceOrder>, MarketplaceError> {
        let mut cursor = self
            .store
            .get_cursor(&account.name)
            .map_err(|e| MarketplaceError::Store(e.to_string()))?;

        let created_after = match &cursor {
            Some(c) => c.updated_at,
            None => self.min_start_date.ok_or_else(|| {
                MarketplaceError::Config(format!(
                    "account {} has no cursor and no minimum start date is configured",
                    account.name
                ))
            })?,
        };

        let mut orders = Vec::new();

        loop {
            let after = cursor.as_ref().map(|c| c.cursor.clone());
            let page =
                self.orders_page(&account.marketplace_token, created_after, after.as_deref())?;

            for edge in &page.edges {
                let mut order = normalize_order(&edge.node)
                    .map_err(|e| MarketplaceError::Decode(e.to_string()))?;
                order.items = self.fetch_order_items(account, &order.id)?;
                orders.push(order);
            }

            // Persist the cursor before requesting the next page. A crash
            // before this write refetches the same page; a crash after it
            // resumes at the next page.
            let Some(end_cursor) = page.page_info.end_cursor else {
                break;
            };
            let next = match cursor.take() {
                Some(c) => c.advanced(end_cursor),
                None => OrderCursor::new(end_cursor),
            };
            self.store
                .save_cursor(&account.name, next.clone())
                .map_err(|e| MarketplaceError::Store(e.to_string()))?;
            cursor = Some(next);

            if !page.page_info.has_next_page {
                break;
            }
            std::thread::sleep(PAGE_DELAY);
        }

        log::debug!(
            "Fetched {} new orders for account {}",
            orders.len(),
            account.name
        );
        Ok(orders)
    }

    fn fetch_order_items(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<Vec<LineItem>, MarketplaceError> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page = self.items_page(&account.marketplace_token, order_id, after.as_deref())?;

            for edge in &page.edges {
                items.push(
                    normalize_item(&edge.node)
                        .map_err(|e| MarketplaceError::Decode(e.to_string()))?,
                );
            }

            if !page.page_info.has_next_page {
                break;
            }
            match page.page_info.end_cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(items)
    }

    fn attach_tracking(
        &self,
        account: &Account,
        order_ids: &[OrderId],
        tracking_code: &str,
        courier: Courier,
    ) -> Result<(), MarketplaceError> {
        let body = AttachTrackingRequest {
            order_ids: order_ids.iter().map(|id| id.0.clone()).collect(),
            tracking_code: tracking_code.to_string(),
            courier: courier.as_str().to_string(),
        };

        let mut response = ureq::post(&format!("{}/orders/tracking", Self::BASE_URL))
            .header(
                "Authorization",
                &format!("Bearer {}", account.marketplace_token),
            )
            .send_json(&body)?;

        let result: AttachTrackingResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| MarketplaceError::Decode(e.to_string()))?;

        match classify_user_errors(&result.user_errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Map mutation user errors to a domain error
///
/// Messages that say the order already carries tracking are a distinct,
/// non-fatal outcome; everything else is an API failure carrying the
/// field/message pairs.
pub(crate) fn classify_user_errors(errors: &[UserError]) -> Option<MarketplaceError> {
    if errors.is_empty() {
        return None;
    }

    let already_tracked = errors.iter().any(|e| {
        let message = e.message.to_lowercase();
        message.contains("already has tracking") || message.contains("cannot override tracking")
    });
    if already_tracked {
        return Some(MarketplaceError::AlreadyTracked);
    }

    let joined = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) => format!("{}: {}", field, e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(MarketplaceError::Api(joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_error(message: &str) -> UserError {
        UserError {
            field: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_no_errors() {
        assert!(classify_user_errors(&[]).is_none());
    }

    #[test]
    fn test_classify_already_tracked() {
        let errors = [user_error("Order cannot override tracking code")];
        assert!(matches!(
            classify_user_errors(&errors),
            Some(MarketplaceError::AlreadyTracked)
        ));

        let errors = [user_error("This order already has tracking attached")];
        assert!(matches!(
            classify_user_errors(&errors),
            Some(MarketplaceError::AlreadyTracked)
        ));
    }

    #[test]
    fn test_classify_api_error_joins_fields() {
        let errors = [
            UserError {
                field: Some("trackingCode".to_string()),
                message: "is invalid".to_string(),
            },
            user_error("order not found"),
        ];

        match classify_user_errors(&errors) {
            Some(MarketplaceError::Api(msg)) => {
                assert!(msg.contains("trackingCode: is invalid"));
                assert!(msg.contains("order not found"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
