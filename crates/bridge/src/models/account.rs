//! Account model pairing a marketplace credential with a destination store

use serde::{Deserialize, Serialize};

/// A configured marketplace/fulfillment account pairing
///
/// Loaded fresh from configuration at the start of every run and treated
/// as read-only input by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Human-readable account name; keys the cursor store
    pub name: String,
    /// Disabled accounts are skipped by both pipelines
    pub enabled: bool,
    /// API token for the marketplace
    #[serde(rename = "marketplaceToken")]
    pub marketplace_token: String,
    /// Store identifier on the fulfillment platform; keys the sync-time
    /// and tracking-state stores
    #[serde(rename = "destinationStoreId")]
    pub store_id: String,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        marketplace_token: impl Into<String>,
        store_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            marketplace_token: marketplace_token.into(),
            store_id: store_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_deserializes_config_shape() {
        let json = r#"{
            "name": "boutique-a",
            "enabled": true,
            "marketplaceToken": "tok-123",
            "destinationStoreId": "store-9"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.name, "boutique-a");
        assert!(account.enabled);
        assert_eq!(account.marketplace_token, "tok-123");
        assert_eq!(account.store_id, "store-9");
    }
}
