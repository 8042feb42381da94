use crate::domain::ledger::LedgerAsset;
use crate::error::ConfigError;
use std::env;
use std::fmt;
use std::time::Duration;

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const DEFAULT_ASSET_CODE: &str = "USDC";
pub const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 30;

/// Secret seed of the hot wallet. Never printed.
#[derive(Clone)]
pub struct HotWalletSecret(String);

impl HotWalletSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HotWalletSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HotWalletSecret(<redacted>)")
    }
}

/// Everything the settlement core needs from its environment.
///
/// Built once at startup and handed to constructors; nothing reads the
/// process environment after that.
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    pub horizon_url: String,
    pub network_passphrase: String,
    /// Only needed by commands that sign ledger payments.
    pub hot_wallet_secret: Option<HotWalletSecret>,
    pub hot_wallet_account: String,
    /// The custodial token disbursed on deposits and expected on withdrawals.
    pub asset: LedgerAsset,
    /// Fixed address users pay withdrawals into.
    pub receiving_account: String,
    pub submission_timeout: Duration,
}

impl AnchorConfig {
    /// Loads the configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let submission_timeout = match lookup("SUBMISSION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "SUBMISSION_TIMEOUT_SECS",
                    reason: format!("{raw:?} is not a number of seconds"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: "SUBMISSION_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_SUBMISSION_TIMEOUT_SECS),
        };

        let asset_code = lookup("ASSET_CODE").unwrap_or_else(|| DEFAULT_ASSET_CODE.to_string());
        if asset_code.is_empty() || asset_code.len() > 12 {
            return Err(ConfigError::Invalid {
                key: "ASSET_CODE",
                reason: "asset codes are 1 to 12 characters".to_string(),
            });
        }

        Ok(Self {
            horizon_url: required("HORIZON_URL")?,
            network_passphrase: lookup("NETWORK_PASSPHRASE")
                .unwrap_or_else(|| TESTNET_PASSPHRASE.to_string()),
            hot_wallet_secret: lookup("HOT_WALLET_SECRET")
                .filter(|value| !value.trim().is_empty())
                .map(HotWalletSecret::new),
            hot_wallet_account: required("HOT_WALLET_ACCOUNT")?,
            asset: LedgerAsset::new(asset_code, required("ASSET_ISSUER")?),
            receiving_account: required("RECEIVING_ACCOUNT")?,
            submission_timeout,
        })
    }
}
