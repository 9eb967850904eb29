//! Configuration loading for the sync engine
//!
//! Three files in the Harbor config directory:
//! - `accounts.json` — the account list (see [`Account`])
//! - `fulfillment-credentials.json` — fulfillment API key/secret
//! - `sync-settings.json` — engine settings
//!
//! Credentials and settings fall back to environment variables when the
//! file is absent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::Account;

const ACCOUNTS_FILE: &str = "accounts.json";
const CREDENTIALS_FILE: &str = "fulfillment-credentials.json";
const SETTINGS_FILE: &str = "sync-settings.json";

/// Load the configured accounts
///
/// Accounts are read fresh at the start of every run and never written
/// back.
pub fn load_accounts() -> Result<Vec<Account>> {
    config::load_json(ACCOUNTS_FILE).context("Failed to load accounts configuration")
}

/// Credentials for the fulfillment platform API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl FulfillmentCredentials {
    /// Load credentials using the following priority:
    /// 1. JSON file (~/.config/harbor/fulfillment-credentials.json)
    /// 2. Environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            return config::load_json(CREDENTIALS_FILE);
        }
        Self::from_env()
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse credentials JSON")
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("HARBOR_FULFILLMENT_API_KEY")
            .context("HARBOR_FULFILLMENT_API_KEY environment variable not set")?;
        let api_secret = std::env::var("HARBOR_FULFILLMENT_API_SECRET")
            .context("HARBOR_FULFILLMENT_API_SECRET environment variable not set")?;

        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Check if credentials are available (file or env vars)
    pub fn is_available() -> bool {
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        std::env::var("HARBOR_FULFILLMENT_API_KEY").is_ok()
            && std::env::var("HARBOR_FULFILLMENT_API_SECRET").is_ok()
    }
}

/// Engine settings that cannot be derived from persisted state
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Lower bound for the first order fetch of an account with no
    /// cursor. Required before an account's first run; later runs resume
    /// from the cursor instead.
    pub min_start_date: Option<DateTime<Utc>>,
}

impl SyncSettings {
    /// Load settings from the config file, falling back to environment
    /// variables, then to empty defaults
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Self::from_env()
    }

    fn from_env() -> Result<Self> {
        let min_start_date = match std::env::var("HARBOR_MIN_START_DATE") {
            Ok(raw) => Some(
                raw.parse::<DateTime<Utc>>()
                    .context("HARBOR_MIN_START_DATE is not a valid RFC 3339 timestamp")?,
            ),
            Err(_) => None,
        };

        Ok(Self { min_start_date })
    }
}
